//! Core types for Jellybridge

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Remote protocol time unit: 100ns ticks per second
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Media types the tracker advertises in every start/progress payload
pub const QUEUEABLE_MEDIA_TYPES: &str = "Video,Audio";

/// Convert a position in seconds to remote ticks, truncating toward zero
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICKS_PER_SECOND as f64) as i64
}

/// Convert remote ticks to whole seconds
pub fn ticks_to_seconds(ticks: i64) -> i64 {
    ticks / TICKS_PER_SECOND
}

/// How the server delivers the stream to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMethod {
    #[serde(alias = "Direct")]
    DirectPlay,
    DirectStream,
    Transcode,
}

impl std::fmt::Display for PlayMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMethod::DirectPlay => write!(f, "DirectPlay"),
            PlayMethod::DirectStream => write!(f, "DirectStream"),
            PlayMethod::Transcode => write!(f, "Transcode"),
        }
    }
}

/// Host subtitle index -> remote subtitle stream index
pub type SubsMapping = BTreeMap<i32, i32>;

/// Action code of an EDL marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum EdlAction {
    /// Cut the interval out of playback
    Cut,
    /// Mute audio during the interval
    Mute,
    /// Scene marker (chapter-like)
    SceneMarker,
    /// Commercial break, skippable
    CommercialBreak,
    /// Any other code, kept opaque
    Other(i32),
}

impl EdlAction {
    /// Codes that mark credits/outro content at the end of an item
    pub fn is_outro(&self) -> bool {
        matches!(self, EdlAction::Cut | EdlAction::CommercialBreak)
    }

    pub fn code(&self) -> i32 {
        (*self).into()
    }
}

impl From<i32> for EdlAction {
    fn from(code: i32) -> Self {
        match code {
            0 => EdlAction::Cut,
            1 => EdlAction::Mute,
            2 => EdlAction::SceneMarker,
            3 => EdlAction::CommercialBreak,
            other => EdlAction::Other(other),
        }
    }
}

impl From<EdlAction> for i32 {
    fn from(action: EdlAction) -> Self {
        match action {
            EdlAction::Cut => 0,
            EdlAction::Mute => 1,
            EdlAction::SceneMarker => 2,
            EdlAction::CommercialBreak => 3,
            EdlAction::Other(code) => code,
        }
    }
}

/// One line of an edit decision list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdlInterval {
    /// Start in seconds
    pub start: f64,
    /// End in seconds; absent for point markers
    pub end: Option<f64>,
    /// Marker action
    pub action: EdlAction,
}

impl EdlInterval {
    pub fn point(start: f64, action: EdlAction) -> Self {
        Self {
            start,
            end: None,
            action,
        }
    }

    pub fn range(start: f64, end: f64, action: EdlAction) -> Self {
        Self {
            start,
            end: Some(end),
            action,
        }
    }

    pub fn is_point(&self) -> bool {
        self.end.is_none()
    }
}

/// Playback descriptor posted by the play path before the host starts playback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PendingPlayback {
    /// Path or URL the host will report as the playing file
    pub path: String,
    /// Remote item id
    pub id: String,
    pub media_source_id: Option<String>,
    pub play_method: Option<PlayMethod>,
    pub volume: Option<u32>,
    /// Resume point in seconds
    pub current_position: f64,
    pub paused: bool,
    pub muted: bool,
    pub play_session_id: Option<String>,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
    /// "Addon" when playback was started from the add-on itself
    pub play_option: Option<String>,
    pub server_id: Option<String>,
    pub subs_mapping: SubsMapping,
    /// Total duration in ticks, when the server reported one
    pub runtime: Option<i64>,
    pub device_id: Option<String>,
    pub live_stream_id: Option<String>,
    /// Remote item type ("Episode", "Movie", ...)
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub current_episode: Option<UpNextEpisode>,
}

impl PendingPlayback {
    pub fn is_addon_play(&self) -> bool {
        self.play_option.as_deref() == Some("Addon")
    }
}

/// Start and progress payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackReport {
    pub queueable_media_types: String,
    pub can_seek: bool,
    pub item_id: String,
    pub media_source_id: Option<String>,
    pub play_method: Option<PlayMethod>,
    pub volume_level: Option<u32>,
    pub position_ticks: i64,
    pub is_paused: bool,
    pub is_muted: bool,
    pub play_session_id: Option<String>,
    pub audio_stream_index: Option<i32>,
    pub subtitle_stream_index: Option<i32>,
}

/// Stop payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StopReport {
    pub item_id: String,
    pub media_source_id: Option<String>,
    pub position_ticks: i64,
    pub play_session_id: Option<String>,
}

/// Application volume state from the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub volume: Option<u32>,
    pub muted: Option<bool>,
}

/// Current stream selection reported by the host player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProperties {
    pub current_audio: Option<i32>,
    pub current_subtitle: Option<i32>,
    pub subtitle_enabled: Option<bool>,
}

/// Per-user state of a remote item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserData {
    pub played: bool,
    pub play_count: Option<u32>,
    pub playback_position_ticks: Option<i64>,
}

/// Item metadata as returned by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteItem {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    pub path: Option<String>,
    pub series_id: Option<String>,
    pub series_name: Option<String>,
    pub season_id: Option<String>,
    pub index_number: Option<u32>,
    pub parent_index_number: Option<u32>,
    pub overview: Option<String>,
    pub community_rating: Option<f32>,
    pub premiere_date: Option<String>,
    pub run_time_ticks: Option<i64>,
    pub user_data: Option<UserData>,
    pub image_tags: HashMap<String, String>,
    pub backdrop_image_tags: Vec<String>,
    pub parent_backdrop_item_id: Option<String>,
    pub parent_backdrop_image_tags: Vec<String>,
    pub series_primary_image_tag: Option<String>,
}

impl RemoteItem {
    pub fn is_played(&self) -> bool {
        self.user_data.as_ref().map(|u| u.played).unwrap_or(false)
    }
}

/// Item list envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemsResponse {
    pub items: Vec<RemoteItem>,
    pub total_record_count: Option<u32>,
}

/// Artwork block of an Up Next episode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpNextArt {
    #[serde(rename = "tvshow.poster")]
    pub tvshow_poster: Option<String>,
    #[serde(rename = "tvshow.fanart")]
    pub tvshow_fanart: Option<String>,
    pub thumb: Option<String>,
}

/// Episode in the Up Next notification format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpNextEpisode {
    pub episodeid: String,
    pub tvshowid: String,
    pub title: Option<String>,
    pub art: UpNextArt,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub showtitle: Option<String>,
    pub plot: Option<String>,
    pub playcount: Option<u32>,
    pub rating: Option<f32>,
    pub firstaired: Option<String>,
    /// Runtime in seconds
    pub runtime: Option<i64>,
}

/// Play command the Up Next overlay sends back to start the next episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayInfo {
    pub item_ids: Vec<String>,
    pub server_id: Option<String>,
    pub play_command: String,
}

/// Next-episode notification payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpNextInfo {
    pub play_info: PlayInfo,
    pub current_episode: UpNextEpisode,
    pub next_episode: UpNextEpisode,
    /// Seconds before the end at which the prompt should trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_time: Option<i64>,
}
