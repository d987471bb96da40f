//! Jellybridge Core - Playback session tracking for Jellyfin-backed Kodi playback
//!
//! This crate follows playback in the host player and mirrors it to the
//! Jellyfin server:
//! - Session registry keyed by the playing file
//! - Lifecycle controller for start/pause/resume/seek/stop notifications
//! - Progress reporting with position-delta rate limiting
//! - EDL sidecar decoding and outro detection
//! - Next-episode planning for the Up Next overlay
//! - Audio/subtitle index reconciliation between host and server
//! - Stop-time cleanup: transcodes, live streams, cached files, delete offer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Jellybridge Core                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  PlayerHost  │  │ PendingQueue │  │   Signals    │          │
//! │  │   (events)   │  │ (descriptors)│  │   (flags)    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │                              │
//! │                    │   Tracker   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │   Progress   │  │   Session   │  │   Up Next    │           │
//! │  │   Reporter   │  │  Registry   │  │   Planner    │           │
//! │  └──────┬───────┘  └─────────────┘  └──────┬───────┘           │
//! │         │                                  │                    │
//! │  ┌──────┴──────────────────────────────────┴───────┐            │
//! │  │          SessionApi (Jellyfin server)           │            │
//! │  └─────────────────────────────────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod edl;
pub mod host;
pub mod remote;
pub mod events;
pub mod retry;
pub mod session;
pub mod registry;
pub mod streams;
pub mod progress;
pub mod upnext;
pub mod tracker;

pub use error::{Error, Result};
pub use types::*;
pub use config::{ServerConfig, TrackerConfig};
pub use edl::{EdlParser, get_outro, load_edl};
pub use host::{HostEvent, LocalFs, MediaFs, PlayerHost};
pub use remote::{JellyfinClient, ServerPool, SessionApi, SingleServer};
pub use events::{EventBus, EventRecord, PendingQueue, Signals, TrackerEvent};
pub use retry::{abort_pair, AbortHandle, AbortSignal, Attempt, RetryPolicy};
pub use session::{Session, SessionState};
pub use registry::SessionRegistry;
pub use progress::{ProgressReporter, ReportOutcome};
pub use upnext::plan_next_episode;
pub use tracker::{PlaybackTracker, StartOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracking library
pub fn init() {
    tracing::info!(version = VERSION, "Jellybridge Core initialized");
}
