use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

const TICK_BUFFER: usize = 16;

/// Background countdown emitting one tick per period.
///
/// The ticking task is aborted when the timer is cancelled or dropped, so a
/// discarded session never receives a stale tick.
#[derive(Debug)]
pub struct ExamTimer {
    ticks: mpsc::Receiver<()>,
    task: JoinHandle<()>,
}

impl ExamTimer {
    /// Spawn the ticking task. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn arm(period: Duration) -> Self {
        let (tx, ticks) = mpsc::channel(TICK_BUFFER);
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        Self { ticks, task }
    }

    /// Wait for the next tick. Returns `false` once the timer is cancelled.
    ///
    /// Cancel safe.
    pub async fn tick(&mut self) -> bool {
        self.ticks.recv().await.is_some()
    }

    /// Stop ticking and discard ticks not yet received.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.ticks.close();
        while self.ticks.try_recv().is_ok() {}
    }
}

impl Drop for ExamTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
