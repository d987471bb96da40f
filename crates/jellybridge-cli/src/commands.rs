//! CLI command implementations

use crate::output::{self, OutputFormat, ReplaySummary};
use crate::scripted::{LoggingApi, ScriptedHost, Trace};
use jellybridge_core::edl::edl_path_for;
use jellybridge_core::{
    get_outro, load_edl, JellyfinClient, LocalFs, PlaybackTracker, ServerConfig, SessionApi,
    SingleServer, TrackerConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Server to replay against
pub struct RemoteTarget {
    pub address: Url,
    pub token: String,
    pub user_id: String,
}

/// Load the tracker configuration, or the defaults without a file
pub fn load_config(path: Option<&Path>) -> anyhow::Result<TrackerConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading tracker config");
            Ok(TrackerConfig::from_file(path)?)
        }
        None => Ok(TrackerConfig::default()),
    }
}

/// Decode a media file's EDL sidecar
pub async fn edl(media: &str, total: Option<i64>, format: &str) -> anyhow::Result<()> {
    let edl_file = edl_path_for(media);
    let edl = load_edl(&LocalFs, media).await;
    let outro = total.map(|total| get_outro(&edl, total));

    println!("{}", output::format_edl(&edl_file, &edl, outro, OutputFormat::from(format))?);
    Ok(())
}

/// Drive a tracker through a scripted trace
pub async fn replay(
    trace_path: &Path,
    config: TrackerConfig,
    server: Option<RemoteTarget>,
    format: &str,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(trace_path).await?;
    let trace = Trace::from_json(&text)?;
    info!(
        trace = %trace_path.display(),
        steps = trace.steps.len(),
        pending = trace.pending.len(),
        "Replaying trace"
    );

    let host = Arc::new(ScriptedHost::new(trace.confirm_delete));
    let logging = Arc::new(LoggingApi::new(trace.items, trace.episodes)?);

    let api: Arc<dyn SessionApi> = match server {
        Some(target) => {
            let mut server_config = ServerConfig::new(target.address, target.token, target.user_id);
            server_config.device_id = config.device_id.clone();
            Arc::new(JellyfinClient::new(server_config)?)
        }
        None => logging.clone(),
    };

    let mut tracker = PlaybackTracker::new(
        config,
        host.clone(),
        Arc::new(SingleServer::new(api)),
        Arc::new(LocalFs),
    );
    let mut events = tracker.events().subscribe();

    for pending in trace.pending {
        tracker.pending().push(pending);
    }

    let mut summary = ReplaySummary::default();
    for step in &trace.steps {
        host.apply(step);
        if let Some(event) = step.host_event() {
            tracker.handle(event).await;
            summary.steps += 1;
        }
        summary.max_sessions = summary.max_sessions.max(tracker.registry().len());
    }

    while let Ok(record) = events.try_recv() {
        summary.events.push(record);
    }
    summary.remote_calls = logging.calls();
    summary.sessions_left = tracker.registry().len();

    println!("{}", output::format_replay(&summary, OutputFormat::from(format))?);
    Ok(())
}

/// Print the effective tracker configuration
pub fn show_config(config: &TrackerConfig) -> anyhow::Result<()> {
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
