//! Playback tracker - session lifecycle controller
//!
//! Translates host lifecycle notifications into session bookkeeping:
//! - start: resolve the playing file, claim its pending descriptor, report
//!   the start, load EDL markers, apply the initial stream selection
//! - pause/resume/seek/tick: progress reporting and next-episode planning
//! - stop/end: close every tracked session on the server and clean up
//!
//! Host notifications are unreliable: stop events can go missing and the
//! player API may fail right after playback starts. Tracking is layered
//! over playback and never blocks it; every failure here is logged and
//! absorbed.

use crate::config::TrackerConfig;
use crate::edl::load_edl;
use crate::events::{EventBus, PendingQueue, Signals, TrackerEvent};
use crate::host::{remove_cached_files, HostEvent, MediaFs, PlayerHost};
use crate::progress::{PeriodicCheck, ProgressReporter, ReportOutcome};
use crate::registry::SessionRegistry;
use crate::remote::ServerPool;
use crate::retry::{AbortSignal, Attempt, RetryPolicy};
use crate::session::{Session, SessionInit, SessionState};
use crate::streams;
use crate::types::{seconds_to_ticks, ticks_to_seconds, PendingPlayback};
use crate::upnext::plan_next_episode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

const DELETE_HEADING: &str = "Confirm delete";
const DELETE_MESSAGE: &str = "Delete file from Jellyfin server?";

/// Outcome of a playback-started notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A session is tracked for the file
    Tracking { file_id: String },
    /// The host never reported a playing file within the retry budget
    NoPlayingFile,
    /// No pending descriptor appeared within the poll budget
    NoPendingPlayback,
    /// The host stopped answering position queries during setup
    HostUnavailable,
    /// The descriptor names a server the pool cannot resolve
    NoServer,
    /// Shutdown was signalled before a session was registered
    Aborted,
}

/// Tracks playback sessions of the host player against the remote server
pub struct PlaybackTracker {
    config: TrackerConfig,
    host: Arc<dyn PlayerHost>,
    servers: Arc<dyn ServerPool>,
    fs: Arc<dyn MediaFs>,
    pending: Arc<PendingQueue>,
    signals: Arc<Signals>,
    events: Arc<EventBus>,
    abort: AbortSignal,
    reporter: ProgressReporter,
    registry: SessionRegistry,
}

impl PlaybackTracker {
    /// Create a tracker with its own pending queue, signals and event bus
    pub fn new(
        config: TrackerConfig,
        host: Arc<dyn PlayerHost>,
        servers: Arc<dyn ServerPool>,
        fs: Arc<dyn MediaFs>,
    ) -> Self {
        let reporter = ProgressReporter::from_config(&config);
        Self {
            config,
            host,
            servers,
            fs,
            pending: Arc::new(PendingQueue::new()),
            signals: Arc::new(Signals::new()),
            events: Arc::new(EventBus::default()),
            abort: AbortSignal::never(),
            reporter,
            registry: SessionRegistry::new(),
        }
    }

    pub fn with_pending(mut self, pending: Arc<PendingQueue>) -> Self {
        self.pending = pending;
        self
    }

    pub fn with_signals(mut self, signals: Arc<Signals>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn pending(&self) -> &Arc<PendingQueue> {
        &self.pending
    }

    pub fn signals(&self) -> &Arc<Signals> {
        &self.signals
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn session(&self, file_id: &str) -> Option<&Session> {
        self.registry.get(file_id)
    }

    /// State of the file's session; `Idle` when untracked
    pub fn state_of(&self, file_id: &str) -> SessionState {
        self.registry
            .get(file_id)
            .map(|session| session.state())
            .unwrap_or(SessionState::Idle)
    }

    /// Dispatch one host notification
    pub async fn handle(&mut self, event: HostEvent) {
        debug!(event = %event, "Host event");
        match event {
            HostEvent::Started => {
                self.on_playback_started().await;
            }
            HostEvent::Paused => self.on_playback_paused().await,
            HostEvent::Resumed => self.on_playback_resumed().await,
            HostEvent::Seek { time, offset } => self.on_playback_seek(time, offset).await,
            HostEvent::Stopped => self.on_playback_stopped().await,
            HostEvent::Ended => self.on_playback_ended().await,
            HostEvent::Tick => {
                self.report_playback(false).await;
            }
        }
    }

    /// Consume host notifications until the channel closes or abort fires
    pub async fn run(&mut self, mut events: mpsc::Receiver<HostEvent>) {
        let abort = self.abort.clone();
        info!("Playback tracker running");

        loop {
            tokio::select! {
                _ = abort.aborted() => {
                    info!("Abort requested, tracker exiting");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }
    }

    /// Playing file of the host, if it is tracked
    fn tracked_playing_file(&self) -> Option<String> {
        let file = match self.host.playing_file() {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "No playing file");
                return None;
            }
        };
        self.registry.contains(&file).then_some(file)
    }

    #[instrument(skip(self))]
    pub async fn on_playback_started(&mut self) -> StartOutcome {
        // A missed stop from the previous playback must not leak its session
        self.stop_playback().await;

        let host = self.host.clone();
        let resolve = RetryPolicy::new(self.config.start_retry_attempts, self.config.start_retry_interval());
        let file = match resolve
            .run(&self.abort, || match host.playing_file() {
                Ok(file) => Some(file),
                Err(e) => {
                    debug!(error = %e, "Playing file not available yet");
                    None
                }
            })
            .await
        {
            Attempt::Ready(file) => file,
            Attempt::Exhausted => {
                info!("Cancel playback report");
                return StartOutcome::NoPlayingFile;
            }
            Attempt::Aborted => return StartOutcome::Aborted,
        };

        let pending = self.pending.clone();
        let poll = RetryPolicy::new(self.config.pending_poll_attempts, self.config.pending_poll_interval());
        let descriptor = match poll.run(&self.abort, || pending.take_for(&file)).await {
            Attempt::Ready(descriptor) => descriptor,
            Attempt::Exhausted => {
                info!(file = %file, "Could not find pending playback");
                return StartOutcome::NoPendingPlayback;
            }
            Attempt::Aborted => return StartOutcome::Aborted,
        };

        let addon_play = descriptor.is_addon_play();
        let outcome = self.start_session(&file, descriptor).await;
        if !matches!(outcome, StartOutcome::Tracking { .. }) {
            return outcome;
        }

        // The session is already tracked; abort only skips stream selection
        if self.abort.wait_for_abort(self.config.stream_selection_delay()).await {
            debug!(file = %file, "Abort during stream selection delay");
            return outcome;
        }

        if addon_play {
            self.apply_initial_streams(&file);
        }

        outcome
    }

    /// Build, register and announce the session for `file`
    async fn start_session(&mut self, file: &str, pending: PendingPlayback) -> StartOutcome {
        let runtime_ticks = match pending.runtime {
            Some(runtime) => runtime,
            None => match self.host.total_time() {
                Ok(total) => {
                    info!(runtime = total, "Runtime is missing, using host runtime");
                    seconds_to_ticks(total)
                }
                Err(_) => {
                    info!("Runtime is missing, using zero");
                    0
                }
            },
        };

        // Past this point the host should be playing; bail out if not
        let seek_time = match self.host.time() {
            Ok(time) => time,
            Err(e) => {
                warn!(file = %file, error = %e, "Host position unavailable, not tracking");
                return StartOutcome::HostUnavailable;
            }
        };

        let volume = self.host.application_volume().unwrap_or_default();

        let api = match self.servers.client(pending.server_id.as_deref()) {
            Ok(api) => api,
            Err(e) => {
                warn!(item_id = %pending.id, error = %e, "No server for playback");
                return StartOutcome::NoServer;
            }
        };

        let edl = match api.get_item(&pending.id).await {
            Ok(item) => match item.path {
                Some(ref path) => load_edl(self.fs.as_ref(), path).await,
                None => Vec::new(),
            },
            Err(e) => {
                warn!(item_id = %pending.id, error = %e, "Item lookup failed, no EDL");
                Vec::new()
            }
        };

        let position = if pending.current_position != 0.0 {
            pending.current_position
        } else {
            seek_time.trunc()
        };

        let mut session = Session::new(SessionInit {
            file_id: file.to_string(),
            pending,
            runtime_ticks,
            position,
            volume,
            edl,
            api,
            default_device_id: self.config.device_id.clone(),
        });

        info!(item_id = %session.item_id(), file = %file, session = ?session, "-->[ play ]");

        let item_id = session.item_id().to_string();
        self.events.emit(TrackerEvent::ItemEdlLoaded {
            item_id: item_id.clone(),
            edl: session.edl().to_vec(),
        });

        if let Err(e) = session.api().session_playing(&session.playback_report()).await {
            warn!(item_id = %item_id, error = %e, "Failed to report playback start");
        }
        if let Err(e) = session.transition(SessionState::Active) {
            debug!(error = %e, "Unexpected state on start");
        }

        self.registry.put(file, session);
        self.events.emit(TrackerEvent::SkipSuppression {
            item_id,
            suppressed: true,
        });

        StartOutcome::Tracking {
            file_id: file.to_string(),
        }
    }

    /// Select the audio/subtitle streams requested by the add-on play path
    fn apply_initial_streams(&self, file: &str) {
        match self.tracked_playing_file() {
            Some(playing) if playing == file => {}
            _ => {
                debug!(file = %file, "File no longer playing, skipping stream selection");
                return;
            }
        }

        if let Some(session) = self.registry.get(file) {
            streams::apply(
                self.host.as_ref(),
                session.subs_mapping(),
                session.audio_stream_index,
                session.subtitle_stream_index,
            );
        }
    }

    pub async fn on_playback_paused(&mut self) {
        self.set_paused(true).await;
        debug!("-->[ paused ]");
    }

    pub async fn on_playback_resumed(&mut self) {
        self.set_paused(false).await;
        debug!("--<[ paused ]");
    }

    async fn set_paused(&mut self, paused: bool) {
        let Some(file) = self.tracked_playing_file() else {
            return;
        };

        if let Some(session) = self.registry.get_mut(&file) {
            session.paused = paused;
            let target = if paused {
                SessionState::Paused
            } else {
                SessionState::Active
            };
            if let Err(e) = session.transition(target) {
                debug!(error = %e, "Pause state unchanged");
            }
        }

        self.report_playback(true).await;
    }

    pub async fn on_playback_seek(&mut self, time: f64, offset: f64) {
        if self.tracked_playing_file().is_some() {
            self.report_playback(true).await;
            info!(time, offset, "--[ seek ]");
        }
    }

    pub async fn on_playback_stopped(&mut self) {
        self.stop_playback().await;
        info!("--<[ playback ]");
    }

    pub async fn on_playback_ended(&mut self) {
        self.stop_playback().await;
        info!("--<<[ playback ]");
    }

    /// Report progress of the playing file.
    ///
    /// `report == false` is the periodic path: rate limited by position
    /// delta and responsible for planning the next episode.
    pub async fn report_playback(&mut self, report: bool) -> ReportOutcome {
        let Some(file) = self.tracked_playing_file() else {
            return ReportOutcome::NotTracked;
        };

        if self.signals.external_player() {
            return ReportOutcome::ExternalPlayer;
        }

        if !report {
            let time = match self.host.time() {
                Ok(time) => time,
                Err(e) => {
                    debug!(error = %e, "Position unavailable");
                    return ReportOutcome::HostUnavailable;
                }
            };

            let check = match self.registry.get_mut(&file) {
                Some(session) => self.reporter.check(session, time),
                None => return ReportOutcome::NotTracked,
            };

            if check.plan_up_next() {
                self.next_up(&file).await;
            }

            match check {
                PeriodicCheck::SpuriousPosition => return ReportOutcome::SpuriousPosition,
                PeriodicCheck::RateLimited { .. } => return ReportOutcome::RateLimited,
                PeriodicCheck::Due { .. } => {}
            }
        }

        let Some(session) = self.registry.get_mut(&file) else {
            return ReportOutcome::NotTracked;
        };

        self.reporter.refresh(session, self.host.as_ref());
        match self.reporter.send(session).await {
            Ok(()) => ReportOutcome::Sent,
            Err(e) => {
                warn!(item_id = %session.item_id(), error = %e, "Failed to report progress");
                ReportOutcome::Failed
            }
        }
    }

    /// Plan the next episode for `file` and emit it; fire and forget
    async fn next_up(&self, file: &str) {
        let Some(session) = self.registry.get(file) else {
            return;
        };

        let total_time = self.host.total_time().ok().map(|total| total as i64);

        match plan_next_episode(session, total_time).await {
            Ok(Some(info)) => {
                info!(next = %info.next_episode.episodeid, "--[ next up ]");
                self.events.emit(TrackerEvent::UpNext(info));
            }
            Ok(None) => {}
            Err(e) => warn!(item_id = %session.item_id(), error = %e, "Next up planning failed"),
        }
    }

    /// Close every tracked session and clear the registry.
    ///
    /// Returns the number of sessions closed. The host does not reliably
    /// report per-file stops, so all sessions are closed, not just the
    /// playing one.
    #[instrument(skip(self))]
    pub async fn stop_playback(&mut self) -> usize {
        if self.registry.is_empty() {
            return 0;
        }

        let files = self.registry.file_ids();
        info!(sessions = files.len(), "Stopping tracked playback");

        for file in &files {
            let Some(mut session) = self.registry.get(file).cloned() else {
                continue;
            };
            self.finish_session(&mut session).await;
        }

        self.registry.clear_all();
        files.len()
    }

    /// Server-side teardown of one session. Each step runs regardless of
    /// earlier failures.
    async fn finish_session(&self, session: &mut Session) {
        let item_id = session.item_id().to_string();
        let api = session.api().clone();

        self.events.emit(TrackerEvent::SkipSuppression {
            item_id: item_id.clone(),
            suppressed: false,
        });

        if self.signals.take_external_player() && session.current_position as i64 == 1 {
            // External players cannot report position; count it as watched
            session.current_position = ticks_to_seconds(session.runtime_ticks()) as f64;
        }

        if let Err(e) = session.transition(SessionState::Stopped) {
            debug!(error = %e, "Session already stopped");
        }

        if let Err(e) = api.session_stop(&session.stop_report()).await {
            warn!(item_id = %item_id, error = %e, "Failed to report playback stop");
        }

        if let Some(live_stream_id) = session.live_stream_id() {
            info!(live_stream_id, "<[ livestream ]");
            if let Err(e) = api.close_live_stream(live_stream_id).await {
                warn!(live_stream_id, error = %e, "Failed to close live stream");
            }
        } else if session.is_transcode() {
            info!(item_id = %item_id, "<[ transcode ]");
            match session.play_session_id() {
                Some(play_session_id) => {
                    if let Err(e) = api.close_transcode(session.device_id(), play_session_id).await {
                        warn!(item_id = %item_id, error = %e, "Failed to close transcode");
                    }
                }
                None => warn!(item_id = %item_id, "Transcode without play session id"),
            }
        }

        let removed = remove_cached_files(self.fs.as_ref(), &self.config.temp_dir, &item_id).await;
        if !removed.is_empty() {
            debug!(item_id = %item_id, files = removed.len(), "Cached files removed");
        }

        self.offer_delete(session).await;

        self.signals.set_external_check(false);
    }

    /// Offer deleting the item once the server marks it watched
    async fn offer_delete(&self, session: &Session) {
        let api = session.api();
        let item = match api.get_item(session.item_id()).await {
            Ok(item) => item,
            Err(e) => {
                warn!(item_id = %session.item_id(), error = %e, "Failed to refresh watched state");
                return;
            }
        };

        if !item.is_played() || !self.config.offers_delete_for(item.item_type.as_deref()) {
            return;
        }

        info!(item_id = %item.id, "Offer delete option");
        let confirmed = self
            .host
            .confirm(DELETE_HEADING, DELETE_MESSAGE, self.config.delete_prompt_timeout())
            .await;

        if confirmed {
            if let Err(e) = api.delete_item(&item.id).await {
                warn!(item_id = %item.id, error = %e, "Failed to delete item");
            }
        }
    }
}
