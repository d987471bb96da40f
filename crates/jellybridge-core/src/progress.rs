//! Progress reporting
//!
//! Periodic checks come from the service tick; explicit reports come from
//! pause, resume and seek. Periodic checks are rate limited by position
//! delta, explicit ones always reach the server.

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::host::PlayerHost;
use crate::session::Session;
use crate::streams;
use tracing::debug;

/// Result of a periodic position check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicCheck {
    /// Host reported exactly 1s; treated as a spurious early position
    SpuriousPosition,
    /// Position moved less than the report interval since the last report
    RateLimited { plan_up_next: bool },
    /// A progress report is due
    Due { plan_up_next: bool },
}

impl PeriodicCheck {
    pub fn plan_up_next(&self) -> bool {
        match self {
            PeriodicCheck::SpuriousPosition => false,
            PeriodicCheck::RateLimited { plan_up_next } | PeriodicCheck::Due { plan_up_next } => {
                *plan_up_next
            }
        }
    }

    pub fn is_due(&self) -> bool {
        matches!(self, PeriodicCheck::Due { .. })
    }
}

/// Outcome of a `report_playback` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The playing file has no tracked session
    NotTracked,
    /// An external player owns playback
    ExternalPlayer,
    /// The host could not report a position
    HostUnavailable,
    SpuriousPosition,
    RateLimited,
    Sent,
    /// The server call failed; the session continues
    Failed,
}

/// Progress reporting rules
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    up_next_threshold: f64,
    report_interval_secs: i64,
}

impl ProgressReporter {
    pub fn new(up_next_threshold: f64, report_interval_secs: i64) -> Self {
        Self {
            up_next_threshold,
            report_interval_secs,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.up_next_threshold, config.report_interval_secs)
    }

    /// Record the host position and decide what the periodic path does.
    ///
    /// The rate limit compares against the position of the last report
    /// sent, not the last check. Sets `up_next_sent` when the played
    /// percentage first crosses the threshold, so the planner runs at most
    /// once per session.
    pub fn check(&self, session: &mut Session, host_time: f64) -> PeriodicCheck {
        session.current_position = host_time.trunc();

        if session.current_position as i64 == 1 {
            return PeriodicCheck::SpuriousPosition;
        }

        let played = session.played_percentage();
        let plan_up_next = played > self.up_next_threshold && !session.up_next_sent;
        if plan_up_next {
            session.up_next_sent = true;
        }

        let delta = session.current_position - session.last_reported_position;
        if delta < self.report_interval_secs as f64 {
            debug!(position = session.current_position, delta, "Progress report rate limited");
            return PeriodicCheck::RateLimited { plan_up_next };
        }

        PeriodicCheck::Due { plan_up_next }
    }

    /// Refresh the session's player-state mirror from the host
    pub fn refresh(&self, session: &mut Session, host: &dyn PlayerHost) {
        match host.application_volume() {
            Ok(volume) => {
                session.volume = volume.volume;
                session.muted = volume.muted.unwrap_or(false);
            }
            Err(e) => debug!(error = %e, "Volume unavailable"),
        }

        match host.time() {
            Ok(time) => session.current_position = time.trunc(),
            Err(e) => debug!(error = %e, "Position unavailable, keeping last"),
        }

        let selection = streams::detect(host, session.subs_mapping());
        session.audio_stream_index = selection.audio_stream_index;
        session.subtitle_stream_index = selection.subtitle_stream_index;
    }

    /// Push the session's progress to its server.
    ///
    /// The position counts as reported even when the call fails.
    pub async fn send(&self, session: &mut Session) -> Result<()> {
        let report = session.playback_report();
        debug!(
            item_id = %report.item_id,
            position_ticks = report.position_ticks,
            paused = report.is_paused,
            "Reporting progress"
        );
        session.last_reported_position = session.current_position;
        session.api().session_progress(&report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{pending, session_with};
    use crate::types::TICKS_PER_SECOND;

    fn reporter() -> ProgressReporter {
        ProgressReporter::new(2.0, 30)
    }

    #[test]
    fn test_spurious_position() {
        let mut session = session_with(pending("a"), 100 * TICKS_PER_SECOND);
        assert_eq!(reporter().check(&mut session, 1.7), PeriodicCheck::SpuriousPosition);
        assert!(!session.up_next_sent);
    }

    #[test]
    fn test_rate_limit_measured_from_last_report() {
        let mut session = session_with(pending("a"), 0);
        session.current_position = 100.0;
        session.last_reported_position = 100.0;

        assert_eq!(
            reporter().check(&mut session, 120.0),
            PeriodicCheck::RateLimited { plan_up_next: false }
        );
        assert_eq!(session.current_position, 120.0);
        assert_eq!(session.last_reported_position, 100.0);

        assert!(reporter().check(&mut session, 149.0).is_due());
    }

    #[tokio::test]
    async fn test_send_moves_rate_limit_baseline() {
        let mut session = session_with(pending("a"), 0);
        assert!(reporter().check(&mut session, 40.0).is_due());

        reporter().send(&mut session).await.unwrap();
        assert_eq!(session.last_reported_position, 40.0);

        assert!(!reporter().check(&mut session, 60.0).is_due());
        assert!(reporter().check(&mut session, 70.0).is_due());
    }

    #[test]
    fn test_one_second_checks_reach_the_interval() {
        let mut session = session_with(pending("a"), 0);
        let due = (2..=40)
            .map(|second| reporter().check(&mut session, second as f64))
            .position(|check| check.is_due());
        assert_eq!(due, Some(28));
    }

    #[test]
    fn test_backward_seek_is_rate_limited() {
        let mut session = session_with(pending("a"), 0);
        session.last_reported_position = 600.0;
        assert!(!reporter().check(&mut session, 10.0).is_due());
    }

    #[test]
    fn test_up_next_guard_fires_once() {
        let mut session = session_with(pending("a"), 1000 * TICKS_PER_SECOND);

        let first = reporter().check(&mut session, 10.0);
        assert!(!first.plan_up_next());

        let second = reporter().check(&mut session, 25.0);
        assert!(second.plan_up_next());
        assert!(session.up_next_sent);

        let third = reporter().check(&mut session, 90.0);
        assert!(third.is_due());
        assert!(!third.plan_up_next());
    }

    #[test]
    fn test_zero_runtime_never_plans() {
        let mut session = session_with(pending("a"), 0);
        let check = reporter().check(&mut session, 5000.0);
        assert!(check.is_due());
        assert!(!check.plan_up_next());
    }
}
