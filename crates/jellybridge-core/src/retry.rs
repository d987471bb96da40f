//! Abort-aware waiting and bounded polling
//!
//! Every wait in the tracker goes through [`AbortSignal::wait_for_abort`] so
//! that host shutdown interrupts retry loops promptly.

use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Trigger side of a cancellation signal
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Observer side of a cancellation signal
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

impl AbortSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = abort_pair();
        signal
    }

    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal fires
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without firing
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleep for `timeout`; returns true if the signal fired first.
    pub async fn wait_for_abort(&self, timeout: Duration) -> bool {
        if self.is_aborted() {
            return true;
        }

        tokio::select! {
            _ = self.aborted() => true,
            _ = tokio::time::sleep(timeout) => self.is_aborted(),
        }
    }
}

/// Outcome of a bounded poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    Ready(T),
    /// Every retry came back empty
    Exhausted,
    /// The abort signal fired while waiting
    Aborted,
}

/// Retry budget: one immediate probe followed by up to `retries` probes,
/// each after waiting `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self { retries, interval }
    }

    pub async fn run<T, F>(&self, abort: &AbortSignal, mut probe: F) -> Attempt<T>
    where
        F: FnMut() -> Option<T>,
    {
        if let Some(value) = probe() {
            return Attempt::Ready(value);
        }

        for attempt in 1..=self.retries {
            if abort.wait_for_abort(self.interval).await {
                return Attempt::Aborted;
            }
            if let Some(value) = probe() {
                debug!(attempt, "Probe succeeded after retry");
                return Attempt::Ready(value);
            }
        }

        Attempt::Exhausted
    }
}
