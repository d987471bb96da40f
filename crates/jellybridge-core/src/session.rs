//! Playback session record
//!
//! One [`Session`] exists per playing file, from the start notification
//! until the stop sweep. Remote identifiers are fixed at creation; the
//! player-state mirror (position, pause, volume, stream indices) is
//! refreshed on every report.

use crate::error::{Error, Result};
use crate::remote::SessionApi;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session tracked for the file
    Idle,
    /// Start notification received, session being set up
    Starting,
    /// Playing and reporting
    Active,
    /// Host player paused
    Paused,
    /// Stop reported to the server; terminal
    Stopped,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Starting)
                | (Starting, Active)
                | (Starting, Stopped)
                | (Active, Paused)
                | (Active, Stopped)
                | (Paused, Active)
                | (Paused, Stopped)
        )
    }

    pub fn is_terminal(&self) -> bool {
        *self == SessionState::Stopped
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Tracked playback of one file
#[derive(Clone)]
pub struct Session {
    file_id: String,
    item_id: String,
    server_id: Option<String>,
    media_source_id: Option<String>,
    play_session_id: Option<String>,
    device_id: String,
    live_stream_id: Option<String>,
    play_method: Option<PlayMethod>,
    item_type: Option<String>,
    current_episode: Option<UpNextEpisode>,
    subs_mapping: SubsMapping,
    edl: Vec<EdlInterval>,
    runtime_ticks: i64,
    api: Arc<dyn SessionApi>,
    state: SessionState,

    /// Elapsed seconds at the last host read
    pub current_position: f64,
    /// Elapsed seconds carried by the last report sent to the server
    pub last_reported_position: f64,
    pub paused: bool,
    pub muted: bool,
    pub volume: Option<u32>,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    /// Next-episode prompt already planned for this session
    pub up_next_sent: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("file_id", &self.file_id)
            .field("item_id", &self.item_id)
            .field("play_session_id", &self.play_session_id)
            .field("play_method", &self.play_method)
            .field("state", &self.state)
            .field("runtime_ticks", &self.runtime_ticks)
            .field("current_position", &self.current_position)
            .field("last_reported_position", &self.last_reported_position)
            .field("paused", &self.paused)
            .field("edl_markers", &self.edl.len())
            .field("up_next_sent", &self.up_next_sent)
            .finish()
    }
}

/// Inputs to [`Session::new`] gathered during session start
pub struct SessionInit {
    pub file_id: String,
    pub pending: PendingPlayback,
    pub runtime_ticks: i64,
    pub position: f64,
    pub volume: VolumeState,
    pub edl: Vec<EdlInterval>,
    pub api: Arc<dyn SessionApi>,
    pub default_device_id: String,
}

impl Session {
    /// Create a session in the `Starting` state
    pub fn new(init: SessionInit) -> Self {
        let SessionInit {
            file_id,
            pending,
            runtime_ticks,
            position,
            volume,
            edl,
            api,
            default_device_id,
        } = init;

        Self {
            file_id,
            item_id: pending.id,
            server_id: pending.server_id,
            media_source_id: pending.media_source_id,
            play_session_id: pending.play_session_id,
            device_id: pending.device_id.unwrap_or(default_device_id),
            live_stream_id: pending.live_stream_id,
            play_method: pending.play_method,
            item_type: pending.item_type,
            current_episode: pending.current_episode,
            subs_mapping: pending.subs_mapping,
            edl,
            runtime_ticks: runtime_ticks.max(0),
            api,
            state: SessionState::Starting,
            current_position: position,
            last_reported_position: position,
            paused: false,
            muted: volume.muted.unwrap_or(pending.muted),
            volume: volume.volume.or(pending.volume),
            audio_stream_index: pending.audio_stream_index,
            subtitle_stream_index: pending.subtitle_stream_index,
            up_next_sent: false,
        }
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    pub fn media_source_id(&self) -> Option<&str> {
        self.media_source_id.as_deref()
    }

    pub fn play_session_id(&self) -> Option<&str> {
        self.play_session_id.as_deref()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn live_stream_id(&self) -> Option<&str> {
        self.live_stream_id.as_deref()
    }

    pub fn play_method(&self) -> Option<PlayMethod> {
        self.play_method
    }

    pub fn item_type(&self) -> Option<&str> {
        self.item_type.as_deref()
    }

    pub fn current_episode(&self) -> Option<&UpNextEpisode> {
        self.current_episode.as_ref()
    }

    pub fn subs_mapping(&self) -> &SubsMapping {
        &self.subs_mapping
    }

    pub fn edl(&self) -> &[EdlInterval] {
        &self.edl
    }

    pub fn runtime_ticks(&self) -> i64 {
        self.runtime_ticks
    }

    pub fn api(&self) -> &Arc<dyn SessionApi> {
        &self.api
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_transcode(&self) -> bool {
        self.play_method == Some(PlayMethod::Transcode)
    }

    /// Move to `target`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, target: SessionState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        debug!(item_id = %self.item_id, from = %self.state, to = %target, "Session transition");
        self.state = target;
        Ok(())
    }

    pub fn position_ticks(&self) -> i64 {
        seconds_to_ticks(self.current_position)
    }

    /// Played share of the runtime in percent; 0 when the runtime is unknown
    pub fn played_percentage(&self) -> f64 {
        if self.runtime_ticks <= 0 {
            return 0.0;
        }
        self.position_ticks() as f64 / self.runtime_ticks as f64 * 100.0
    }

    /// Start/progress payload for the current state
    pub fn playback_report(&self) -> PlaybackReport {
        PlaybackReport {
            queueable_media_types: QUEUEABLE_MEDIA_TYPES.to_string(),
            can_seek: true,
            item_id: self.item_id.clone(),
            media_source_id: self.media_source_id.clone(),
            play_method: self.play_method,
            volume_level: self.volume,
            position_ticks: self.position_ticks(),
            is_paused: self.paused,
            is_muted: self.muted,
            play_session_id: self.play_session_id.clone(),
            audio_stream_index: self.audio_stream_index,
            subtitle_stream_index: self.subtitle_stream_index,
        }
    }

    pub fn stop_report(&self) -> StopReport {
        StopReport {
            item_id: self.item_id.clone(),
            media_source_id: self.media_source_id.clone(),
            position_ticks: self.position_ticks(),
            play_session_id: self.play_session_id.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use url::Url;

    /// API that accepts every call and returns empty data
    pub(crate) struct NullApi(Url);

    impl NullApi {
        pub(crate) fn arc() -> Arc<dyn SessionApi> {
            Arc::new(NullApi(Url::parse("http://localhost:8096/").unwrap()))
        }
    }

    #[async_trait]
    impl SessionApi for NullApi {
        async fn session_playing(&self, _: &PlaybackReport) -> Result<()> {
            Ok(())
        }
        async fn session_progress(&self, _: &PlaybackReport) -> Result<()> {
            Ok(())
        }
        async fn session_stop(&self, _: &StopReport) -> Result<()> {
            Ok(())
        }
        async fn close_live_stream(&self, _: &str) -> Result<()> {
            Ok(())
        }
        async fn close_transcode(&self, _: &str, _: &str) -> Result<()> {
            Ok(())
        }
        async fn get_item(&self, id: &str) -> Result<RemoteItem> {
            Ok(RemoteItem {
                id: id.to_string(),
                ..Default::default()
            })
        }
        async fn get_adjacent_episodes(&self, _: &str, _: &str) -> Result<ItemsResponse> {
            Ok(ItemsResponse::default())
        }
        async fn delete_item(&self, _: &str) -> Result<()> {
            Ok(())
        }
        fn server_address(&self) -> &Url {
            &self.0
        }
    }

    pub(crate) fn session_with(pending: PendingPlayback, runtime_ticks: i64) -> Session {
        Session::new(SessionInit {
            file_id: pending.path.clone(),
            pending,
            runtime_ticks,
            position: 0.0,
            volume: VolumeState::default(),
            edl: Vec::new(),
            api: NullApi::arc(),
            default_device_id: "dev-default".into(),
        })
    }

    pub(crate) fn pending(id: &str) -> PendingPlayback {
        PendingPlayback {
            path: format!("/media/{}.mkv", id),
            id: id.to_string(),
            media_source_id: Some(id.to_string()),
            play_session_id: Some("ps-1".into()),
            play_method: Some(PlayMethod::DirectPlay),
            ..Default::default()
        }
    }

    #[test]
    fn test_state_transitions() {
        use SessionState::*;
        assert!(Idle.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Active));
        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Stopped));

        assert!(!Idle.can_transition_to(Active));
        assert!(!Paused.can_transition_to(Paused));
        assert!(!Stopped.can_transition_to(Active));
        assert!(Stopped.is_terminal());
    }

    #[test]
    fn test_transition_rejects_invalid() {
        let mut session = session_with(pending("a"), 0);
        assert_eq!(session.state(), SessionState::Starting);
        assert!(session.transition(SessionState::Paused).is_err());
        assert!(session.transition(SessionState::Active).is_ok());
        assert!(session.transition(SessionState::Paused).is_ok());
    }

    #[test]
    fn test_played_percentage() {
        let mut session = session_with(pending("a"), 1000 * TICKS_PER_SECOND);
        session.current_position = 50.0;
        assert!((session.played_percentage() - 5.0).abs() < f64::EPSILON);

        let mut unknown = session_with(pending("b"), 0);
        unknown.current_position = 50.0;
        assert_eq!(unknown.played_percentage(), 0.0);
    }

    #[test]
    fn test_device_id_fallback() {
        let session = session_with(pending("a"), 0);
        assert_eq!(session.device_id(), "dev-default");

        let mut with_device = pending("b");
        with_device.device_id = Some("dev-b".into());
        assert_eq!(session_with(with_device, 0).device_id(), "dev-b");
    }

    #[test]
    fn test_reports() {
        let mut session = session_with(pending("a"), -5);
        session.current_position = 12.5;
        session.paused = true;

        assert_eq!(session.runtime_ticks(), 0);
        let report = session.playback_report();
        assert_eq!(report.position_ticks, 125_000_000);
        assert!(report.is_paused);
        assert_eq!(report.queueable_media_types, "Video,Audio");

        let stop = session.stop_report();
        assert_eq!(stop.item_id, "a");
        assert_eq!(stop.play_session_id.as_deref(), Some("ps-1"));
    }
}
