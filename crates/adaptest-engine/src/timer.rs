//! Cancellable periodic section clock.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Buffered ticks before the timer task waits on the consumer.
const TICK_BUFFER: usize = 8;

/// A periodic tick source backed by a spawned tokio task.
///
/// The first tick fires one period after the timer starts. The task is
/// aborted by [`SectionTimer::cancel`] or when the timer is dropped,
/// whichever comes first, and never twice.
#[derive(Debug)]
pub struct SectionTimer {
    period: Duration,
    task: Option<JoinHandle<()>>,
    ticks: mpsc::Receiver<()>,
}

impl SectionTimer {
    /// Starts a timer that ticks every `period`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        let (sender, ticks) = mpsc::channel(TICK_BUFFER);
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if sender.send(()).await.is_err() {
                    break;
                }
            }
        });

        debug!(period_ms = period.as_millis(), "Section timer started");
        Self {
            period,
            task: Some(task),
            ticks,
        }
    }

    /// Waits for the next tick.
    ///
    /// Returns `None` once the timer has been cancelled.
    pub async fn next_tick(&mut self) -> Option<()> {
        if self.task.is_none() {
            return None;
        }
        self.ticks.recv().await
    }

    /// Stops the timer.
    ///
    /// Returns `true` if this call stopped it and `false` if it was already
    /// stopped.
    pub fn cancel(&mut self) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        task.abort();
        self.ticks.close();
        debug!(period_ms = self.period.as_millis(), "Section timer cancelled");
        true
    }

    /// Returns `true` until the timer is cancelled.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for SectionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
