//! Scripted host and logging server used by `replay`

use async_trait::async_trait;
use jellybridge_core::{
    Error, HostEvent, ItemsResponse, PendingPlayback, PlaybackReport, PlayerHost, RemoteItem,
    Result, SessionApi, StopReport, StreamProperties, VolumeState,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Host trace: descriptors to queue, server data to serve, and the steps
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub pending: Vec<PendingPlayback>,
    /// Items the logging server returns from item lookups
    pub items: Vec<RemoteItem>,
    /// Episode list the logging server returns for adjacency lookups
    pub episodes: Vec<RemoteItem>,
    /// Answer to the delete dialog
    pub confirm_delete: bool,
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// One host notification with the player state at that moment.
///
/// Omitted fields keep their previous value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TraceStep {
    pub event: Option<TraceEvent>,
    /// Playing file; an empty string means nothing is playing
    pub playing: Option<String>,
    pub time: Option<f64>,
    pub total: Option<f64>,
    pub volume: Option<u32>,
    pub muted: Option<bool>,
    pub audio: Option<i32>,
    pub subtitle: Option<i32>,
    pub subtitles_enabled: Option<bool>,
    pub audio_streams: Option<usize>,
    pub subtitle_streams: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEvent {
    Started,
    Paused,
    Resumed,
    Seek,
    Stopped,
    Ended,
    Tick,
}

impl TraceStep {
    pub fn host_event(&self) -> Option<HostEvent> {
        let event = match self.event? {
            TraceEvent::Started => HostEvent::Started,
            TraceEvent::Paused => HostEvent::Paused,
            TraceEvent::Resumed => HostEvent::Resumed,
            TraceEvent::Seek => HostEvent::Seek {
                time: self.time.unwrap_or(0.0),
                offset: 0.0,
            },
            TraceEvent::Stopped => HostEvent::Stopped,
            TraceEvent::Ended => HostEvent::Ended,
            TraceEvent::Tick => HostEvent::Tick,
        };
        Some(event)
    }
}

#[derive(Debug, Default)]
struct HostSnapshot {
    playing: Option<String>,
    time: Option<f64>,
    total: Option<f64>,
    volume: VolumeState,
    streams: StreamProperties,
    audio_streams: usize,
    subtitle_streams: usize,
}

/// [`PlayerHost`] whose state is set by trace steps
#[derive(Debug, Default)]
pub struct ScriptedHost {
    state: Mutex<HostSnapshot>,
    confirm_delete: bool,
}

impl ScriptedHost {
    pub fn new(confirm_delete: bool) -> Self {
        Self {
            state: Mutex::new(HostSnapshot::default()),
            confirm_delete,
        }
    }

    /// Apply the player state carried by `step`
    pub fn apply(&self, step: &TraceStep) {
        let mut state = self.lock();

        if let Some(ref playing) = step.playing {
            state.playing = (!playing.is_empty()).then(|| playing.clone());
        }
        if step.time.is_some() {
            state.time = step.time;
        }
        if step.total.is_some() {
            state.total = step.total;
        }
        if step.volume.is_some() {
            state.volume.volume = step.volume;
        }
        if step.muted.is_some() {
            state.volume.muted = step.muted;
        }
        if step.audio.is_some() {
            state.streams.current_audio = step.audio;
        }
        if step.subtitle.is_some() {
            state.streams.current_subtitle = step.subtitle;
        }
        if step.subtitles_enabled.is_some() {
            state.streams.subtitle_enabled = step.subtitles_enabled;
        }
        if let Some(count) = step.audio_streams {
            state.audio_streams = count;
        }
        if let Some(count) = step.subtitle_streams {
            state.subtitle_streams = count;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PlayerHost for ScriptedHost {
    fn playing_file(&self) -> Result<String> {
        self.lock().playing.clone().ok_or(Error::NotPlaying)
    }

    fn time(&self) -> Result<f64> {
        self.lock().time.ok_or(Error::NotPlaying)
    }

    fn total_time(&self) -> Result<f64> {
        self.lock().total.ok_or(Error::NotPlaying)
    }

    fn application_volume(&self) -> Result<VolumeState> {
        Ok(self.lock().volume)
    }

    fn stream_properties(&self) -> Result<StreamProperties> {
        Ok(self.lock().streams)
    }

    fn audio_stream_count(&self) -> usize {
        self.lock().audio_streams
    }

    fn subtitle_stream_count(&self) -> usize {
        self.lock().subtitle_streams
    }

    fn set_audio_stream(&self, index: i32) {
        info!(index, "host: select audio stream");
        self.lock().streams.current_audio = Some(index);
    }

    fn set_subtitle_stream(&self, index: i32) {
        info!(index, "host: select subtitle stream");
        let mut state = self.lock();
        state.streams.current_subtitle = Some(index);
        state.streams.subtitle_enabled = Some(true);
    }

    fn show_subtitles(&self, visible: bool) {
        info!(visible, "host: show subtitles");
        self.lock().streams.subtitle_enabled = Some(visible);
    }

    async fn confirm(&self, heading: &str, message: &str, _autoclose: Duration) -> bool {
        info!(heading, message, answer = self.confirm_delete, "host: dialog");
        self.confirm_delete
    }
}

/// [`SessionApi`] that logs every call and answers from the trace
pub struct LoggingApi {
    address: Url,
    items: HashMap<String, RemoteItem>,
    episodes: Vec<RemoteItem>,
    calls: Mutex<Vec<String>>,
}

impl LoggingApi {
    pub fn new(items: Vec<RemoteItem>, episodes: Vec<RemoteItem>) -> Result<Self> {
        Ok(Self {
            address: Url::parse("http://jellyfin.invalid/")?,
            items: items.into_iter().map(|item| (item.id.clone(), item)).collect(),
            episodes,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Calls made so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: String) {
        info!(call = %call, "remote");
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }
}

#[async_trait]
impl SessionApi for LoggingApi {
    async fn session_playing(&self, report: &PlaybackReport) -> Result<()> {
        self.record(format!("playing {} at {}", report.item_id, report.position_ticks));
        Ok(())
    }

    async fn session_progress(&self, report: &PlaybackReport) -> Result<()> {
        self.record(format!(
            "progress {} at {} paused={}",
            report.item_id, report.position_ticks, report.is_paused
        ));
        Ok(())
    }

    async fn session_stop(&self, report: &StopReport) -> Result<()> {
        self.record(format!("stopped {} at {}", report.item_id, report.position_ticks));
        Ok(())
    }

    async fn close_live_stream(&self, live_stream_id: &str) -> Result<()> {
        self.record(format!("close live stream {}", live_stream_id));
        Ok(())
    }

    async fn close_transcode(&self, device_id: &str, play_session_id: &str) -> Result<()> {
        self.record(format!("close transcode {} {}", device_id, play_session_id));
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem> {
        self.record(format!("get item {}", item_id));
        Ok(self.items.get(item_id).cloned().unwrap_or_else(|| RemoteItem {
            id: item_id.to_string(),
            ..Default::default()
        }))
    }

    async fn get_adjacent_episodes(&self, show_id: &str, item_id: &str) -> Result<ItemsResponse> {
        self.record(format!("adjacent episodes {} around {}", show_id, item_id));
        Ok(ItemsResponse {
            items: self.episodes.clone(),
            total_record_count: Some(self.episodes.len() as u32),
        })
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        self.record(format!("delete item {}", item_id));
        Ok(())
    }

    fn server_address(&self) -> &Url {
        &self.address
    }
}
