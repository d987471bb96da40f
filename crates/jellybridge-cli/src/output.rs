//! Output formatting for CLI

use jellybridge_core::{EdlInterval, EventRecord, TrackerEvent};
use serde::Serialize;
use std::fmt::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Serialize)]
struct EdlReport<'a> {
    file: &'a str,
    intervals: &'a [EdlInterval],
    #[serde(skip_serializing_if = "Option::is_none")]
    outro: Option<i64>,
}

/// Render decoded EDL intervals and the outro time
pub fn format_edl(
    file: &str,
    edl: &[EdlInterval],
    outro: Option<i64>,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&EdlReport {
            file,
            intervals: edl,
            outro,
        });
    }

    let mut out = String::new();
    let _ = writeln!(out, "EDL: {}", file);
    if edl.is_empty() {
        let _ = writeln!(out, "  (no markers)");
    }
    for (i, interval) in edl.iter().enumerate() {
        let _ = match interval.end {
            Some(end) => writeln!(
                out,
                "  {}. {:>9.2} - {:>9.2}  {:?}",
                i + 1,
                interval.start,
                end,
                interval.action
            ),
            None => writeln!(out, "  {}. {:>9.2}              {:?}", i + 1, interval.start, interval.action),
        };
    }
    if let Some(outro) = outro {
        match outro {
            0 => {
                let _ = writeln!(out, "Outro: none");
            }
            secs => {
                let _ = writeln!(out, "Outro: {}s before the end", secs);
            }
        }
    }

    Ok(out.trim_end().to_string())
}

/// What a replay produced
#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    pub steps: usize,
    pub max_sessions: usize,
    pub sessions_left: usize,
    pub events: Vec<EventRecord>,
    /// Remote calls recorded by the logging server; empty against a real server
    pub remote_calls: Vec<String>,
}

fn describe(event: &TrackerEvent) -> String {
    match event {
        TrackerEvent::ItemEdlLoaded { item_id, edl } => {
            format!("{} item={} markers={}", event.name(), item_id, edl.len())
        }
        TrackerEvent::UpNext(info) => format!(
            "{} next={} notification_time={:?}",
            event.name(),
            info.next_episode.episodeid,
            info.notification_time
        ),
        TrackerEvent::SkipSuppression { item_id, suppressed } => {
            format!("{} item={} suppressed={}", event.name(), item_id, suppressed)
        }
    }
}

/// Render a replay summary
pub fn format_replay(summary: &ReplaySummary, format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(summary);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Replay: {} host events", summary.steps);
    let _ = writeln!(out, "  Peak sessions: {}", summary.max_sessions);
    let _ = writeln!(out, "  Sessions left: {}", summary.sessions_left);

    let _ = writeln!(out, "\nEvents:");
    for record in &summary.events {
        let _ = writeln!(out, "  #{} {}", record.sequence, describe(&record.event));
    }

    if !summary.remote_calls.is_empty() {
        let _ = writeln!(out, "\nRemote calls:");
        for call in &summary.remote_calls {
            let _ = writeln!(out, "  {}", call);
        }
    }

    Ok(out.trim_end().to_string())
}
