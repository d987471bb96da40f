//! Outbound events and shared signals
//!
//! Other collaborators (UI overlay, skip-intro service, the play path) talk
//! to the tracker through three objects:
//! - [`EventBus`] - one-way notifications produced by the tracker
//! - [`Signals`] - flags written elsewhere and read by the tracker
//! - [`PendingQueue`] - playback descriptors posted before playback starts

use crate::types::{EdlInterval, PendingPlayback, UpNextInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Events produced by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TrackerEvent {
    /// EDL markers of the item that just started
    #[serde(rename = "ItemEDLLoaded")]
    ItemEdlLoaded {
        item_id: String,
        edl: Vec<EdlInterval>,
    },

    /// Next-episode prompt payload
    #[serde(rename = "upnext_data")]
    UpNext(UpNextInfo),

    /// Skip prompts for the item are suppressed (start) or released (stop)
    #[serde(rename = "skip_suppression")]
    SkipSuppression { item_id: String, suppressed: bool },
}

impl TrackerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrackerEvent::ItemEdlLoaded { .. } => "ItemEDLLoaded",
            TrackerEvent::UpNext(_) => "upnext_data",
            TrackerEvent::SkipSuppression { .. } => "skip_suppression",
        }
    }
}

/// Event with delivery metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event ID
    pub id: Uuid,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Sequence number
    pub sequence: u64,
    /// The event
    #[serde(flatten)]
    pub event: TrackerEvent,
}

/// Fire-and-forget broadcast of tracker events
pub struct EventBus {
    sender: broadcast::Sender<EventRecord>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Emit an event; returns its sequence number.
    ///
    /// Delivery is not acknowledged. With no subscriber the event is dropped.
    pub fn emit(&self, event: TrackerEvent) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let name = event.name();

        let record = EventRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sequence,
            event,
        };

        match self.sender.send(record) {
            Ok(receivers) => debug!(event = name, sequence, receivers, "Event emitted"),
            Err(_) => debug!(event = name, sequence, "Event dropped, no subscribers"),
        }

        sequence
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Flags set by other collaborators
#[derive(Debug, Default)]
pub struct Signals {
    external_player: AtomicBool,
    external_check: AtomicBool,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Playback runs in an external player that cannot report position
    pub fn external_player(&self) -> bool {
        self.external_player.load(Ordering::SeqCst)
    }

    pub fn set_external_player(&self, value: bool) {
        self.external_player.store(value, Ordering::SeqCst);
    }

    /// Returns the previous value and clears the flag
    pub fn take_external_player(&self) -> bool {
        self.external_player.swap(false, Ordering::SeqCst)
    }

    pub fn external_check(&self) -> bool {
        self.external_check.load(Ordering::SeqCst)
    }

    pub fn set_external_check(&self, value: bool) {
        self.external_check.store(value, Ordering::SeqCst);
    }
}

/// Playback descriptors waiting for the host to start playing
#[derive(Debug, Default)]
pub struct PendingQueue {
    items: Mutex<VecDeque<PendingPlayback>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, pending: PendingPlayback) {
        info!(item_id = %pending.id, path = %pending.path, "Pending playback queued");
        self.lock().push_back(pending);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Take the descriptor for `path`, or the oldest one when none matches.
    ///
    /// Hosts may normalise paths differently from the play path, so an
    /// inexact match still consumes a descriptor.
    pub fn take_for(&self, path: &str) -> Option<PendingPlayback> {
        let mut items = self.lock();

        match items.iter().position(|item| item.path == path) {
            Some(index) => items.remove(index),
            None => {
                let fallback = items.pop_front();
                if let Some(ref item) = fallback {
                    debug!(expected = %path, queued = %item.path, "No exact pending match, using oldest");
                }
                fallback
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingPlayback>> {
        // A poisoned queue still holds valid descriptors
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}
