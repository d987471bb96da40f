//! Test doubles for the host player, the server and the filesystem

#![allow(dead_code)]

use async_trait::async_trait;
use jellybridge_core::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

// =============================================================================
// Host
// =============================================================================

#[derive(Debug, Default)]
pub struct HostState {
    pub playing: Option<String>,
    pub time: Option<f64>,
    pub total: Option<f64>,
    pub volume: VolumeState,
    pub streams: StreamProperties,
    pub audio_streams: usize,
    pub subtitle_streams: usize,
    pub confirm_answer: bool,
    pub confirms: usize,
    pub selected_audio: Option<i32>,
    pub selected_subtitle: Option<i32>,
    pub subtitles_visible: Option<bool>,
}

#[derive(Debug, Default)]
pub struct FakeHost {
    pub state: Mutex<HostState>,
}

impl FakeHost {
    pub fn playing(file: &str, total: f64) -> Arc<Self> {
        let host = FakeHost::default();
        {
            let mut state = host.state.lock().unwrap();
            state.playing = Some(file.to_string());
            state.time = Some(0.0);
            state.total = Some(total);
            state.volume = VolumeState {
                volume: Some(80),
                muted: Some(false),
            };
        }
        Arc::new(host)
    }

    pub fn set_time(&self, time: f64) {
        self.state.lock().unwrap().time = Some(time);
    }

    pub fn set_playing(&self, file: Option<&str>) {
        self.state.lock().unwrap().playing = file.map(str::to_string);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut HostState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl PlayerHost for FakeHost {
    fn playing_file(&self) -> Result<String> {
        self.state.lock().unwrap().playing.clone().ok_or(Error::NotPlaying)
    }

    fn time(&self) -> Result<f64> {
        self.state.lock().unwrap().time.ok_or(Error::NotPlaying)
    }

    fn total_time(&self) -> Result<f64> {
        self.state.lock().unwrap().total.ok_or(Error::NotPlaying)
    }

    fn application_volume(&self) -> Result<VolumeState> {
        Ok(self.state.lock().unwrap().volume)
    }

    fn stream_properties(&self) -> Result<StreamProperties> {
        Ok(self.state.lock().unwrap().streams)
    }

    fn audio_stream_count(&self) -> usize {
        self.state.lock().unwrap().audio_streams
    }

    fn subtitle_stream_count(&self) -> usize {
        self.state.lock().unwrap().subtitle_streams
    }

    fn set_audio_stream(&self, index: i32) {
        self.state.lock().unwrap().selected_audio = Some(index);
    }

    fn set_subtitle_stream(&self, index: i32) {
        self.state.lock().unwrap().selected_subtitle = Some(index);
    }

    fn show_subtitles(&self, visible: bool) {
        self.state.lock().unwrap().subtitles_visible = Some(visible);
    }

    async fn confirm(&self, _heading: &str, _message: &str, _autoclose: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        state.confirms += 1;
        state.confirm_answer
    }
}

// =============================================================================
// Server
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Playing(PlaybackReport),
    Progress(PlaybackReport),
    Stop(StopReport),
    CloseLiveStream(String),
    CloseTranscode { device_id: String, play_session_id: String },
    GetItem(String),
    Adjacent { show_id: String, item_id: String },
    Delete(String),
}

pub struct RecordingApi {
    address: Url,
    pub calls: Mutex<Vec<ApiCall>>,
    pub items: Mutex<HashMap<String, RemoteItem>>,
    pub adjacent: Mutex<Vec<RemoteItem>>,
    pub fail_progress: Mutex<bool>,
    pub fail_stop: Mutex<bool>,
    pub fail_close: Mutex<bool>,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            address: Url::parse("http://jellyfin.local:8096/").unwrap(),
            calls: Mutex::new(Vec::new()),
            items: Mutex::new(HashMap::new()),
            adjacent: Mutex::new(Vec::new()),
            fail_progress: Mutex::new(false),
            fail_stop: Mutex::new(false),
            fail_close: Mutex::new(false),
        })
    }

    pub fn add_item(&self, item: RemoteItem) {
        self.items.lock().unwrap().insert(item.id.clone(), item);
    }

    pub fn set_adjacent(&self, items: Vec<RemoteItem>) {
        *self.adjacent.lock().unwrap() = items;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stops(&self) -> Vec<StopReport> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Stop(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<PlaybackReport> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Progress(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(switch: &Mutex<bool>, call: &'static str) -> Result<()> {
        if *switch.lock().unwrap() {
            return Err(Error::HttpStatus { call, status: 503 });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionApi for RecordingApi {
    async fn session_playing(&self, report: &PlaybackReport) -> Result<()> {
        self.record(ApiCall::Playing(report.clone()));
        Ok(())
    }

    async fn session_progress(&self, report: &PlaybackReport) -> Result<()> {
        self.record(ApiCall::Progress(report.clone()));
        Self::outcome(&self.fail_progress, "session_progress")
    }

    async fn session_stop(&self, report: &StopReport) -> Result<()> {
        self.record(ApiCall::Stop(report.clone()));
        Self::outcome(&self.fail_stop, "session_stop")
    }

    async fn close_live_stream(&self, live_stream_id: &str) -> Result<()> {
        self.record(ApiCall::CloseLiveStream(live_stream_id.to_string()));
        Self::outcome(&self.fail_close, "close_live_stream")
    }

    async fn close_transcode(&self, device_id: &str, play_session_id: &str) -> Result<()> {
        self.record(ApiCall::CloseTranscode {
            device_id: device_id.to_string(),
            play_session_id: play_session_id.to_string(),
        });
        Self::outcome(&self.fail_close, "close_transcode")
    }

    async fn get_item(&self, item_id: &str) -> Result<RemoteItem> {
        self.record(ApiCall::GetItem(item_id.to_string()));
        self.items
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or(Error::HttpStatus {
                call: "get_item",
                status: 404,
            })
    }

    async fn get_adjacent_episodes(&self, show_id: &str, item_id: &str) -> Result<ItemsResponse> {
        self.record(ApiCall::Adjacent {
            show_id: show_id.to_string(),
            item_id: item_id.to_string(),
        });
        Ok(ItemsResponse {
            items: self.adjacent.lock().unwrap().clone(),
            total_record_count: None,
        })
    }

    async fn delete_item(&self, item_id: &str) -> Result<()> {
        self.record(ApiCall::Delete(item_id.to_string()));
        Ok(())
    }

    fn server_address(&self) -> &Url {
        &self.address
    }
}

// =============================================================================
// Filesystem
// =============================================================================

#[derive(Debug, Default)]
pub struct MemFs {
    pub files: Mutex<BTreeMap<String, String>>,
}

impl MemFs {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        let fs = MemFs::default();
        {
            let mut map = fs.files.lock().unwrap();
            for (path, text) in files {
                map.insert(path.to_string(), text.to_string());
            }
        }
        Arc::new(fs)
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl MediaFs for MemFs {
    async fn read_to_string_if_exists(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .map(Path::new)
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().into_owned();
        match self.files.lock().unwrap().remove(&key) {
            Some(_) => Ok(()),
            None => Err(Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound))),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub const TEMP_DIR: &str = "/tmp/jellybridge-test";

pub fn config() -> TrackerConfig {
    TrackerConfig {
        device_id: "dev-test".to_string(),
        temp_dir: TEMP_DIR.into(),
        ..Default::default()
    }
}

pub fn pending(id: &str, path: &str) -> PendingPlayback {
    PendingPlayback {
        path: path.to_string(),
        id: id.to_string(),
        media_source_id: Some(id.to_string()),
        play_method: Some(PlayMethod::DirectPlay),
        play_session_id: Some(format!("ps-{}", id)),
        runtime: Some(1200 * TICKS_PER_SECOND),
        ..Default::default()
    }
}

pub fn item(id: &str, path: &str) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        path: Some(path.to_string()),
        ..Default::default()
    }
}

pub struct Harness {
    pub host: Arc<FakeHost>,
    pub api: Arc<RecordingApi>,
    pub fs: Arc<MemFs>,
    pub tracker: PlaybackTracker,
}

impl Harness {
    pub fn new(host: Arc<FakeHost>, fs: Arc<MemFs>, config: TrackerConfig) -> Self {
        let api = RecordingApi::new();
        let servers = Arc::new(SingleServer::new(api.clone()));
        let tracker = PlaybackTracker::new(config, host.clone(), servers, fs.clone());
        Self {
            host,
            api,
            fs,
            tracker,
        }
    }

    pub fn playing(file: &str) -> Self {
        Self::new(FakeHost::playing(file, 1200.0), Arc::new(MemFs::default()), config())
    }
}

/// Events received so far
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<EventRecord>) -> Vec<TrackerEvent> {
    let mut events = Vec::new();
    while let Ok(record) = rx.try_recv() {
        events.push(record.event);
    }
    events
}
