//! Background one-second tick loop
//!
//! The loop only touches the shared counter. Everything else (display,
//! persistence) happens on the controller after it receives a [`Tick`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Delay between increments
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Posted to the controller after every increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Run that produced the tick
    pub run_id: u64,
    /// Counter value right after the increment
    pub elapsed: u64,
}

/// A live tick loop. Dropping it cancels the loop.
pub struct TimerRun {
    id: u64,
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TimerRun {
    /// Spawn a tick loop on the current tokio runtime
    pub fn spawn(id: u64, elapsed: Arc<AtomicU64>, ticks: mpsc::UnboundedSender<Tick>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(id, elapsed, ticks, cancel_rx));
        Self { id, cancel_tx, handle }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request cancellation. The loop exits at its next wakeup without
    /// incrementing; the returned handle resolves once it has.
    pub fn cancel(self) -> JoinHandle<()> {
        let _ = self.cancel_tx.send(true);
        debug!(run_id = self.id, "tick loop cancelled");
        self.handle
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn tick_loop(
    id: u64,
    elapsed: Arc<AtomicU64>,
    ticks: mpsc::UnboundedSender<Tick>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    debug!(run_id = id, "tick loop started");

    loop {
        tokio::select! {
            biased;
            // A dropped sender counts as cancellation too
            _ = cancel_rx.changed() => break,
            _ = tokio::time::sleep(TICK_INTERVAL) => {}
        }

        if *cancel_rx.borrow() {
            break;
        }

        let value = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
        if ticks.send(Tick { run_id: id, elapsed: value }).is_err() {
            break;
        }
    }

    debug!(run_id = id, "tick loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let counter = Arc::new(AtomicU64::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = TimerRun::spawn(7, Arc::clone(&counter), tx);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let mut seen = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            seen.push(tick);
        }
        assert_eq!(
            seen,
            vec![
                Tick { run_id: 7, elapsed: 1 },
                Tick { run_id: 7, elapsed: 2 },
                Tick { run_id: 7, elapsed: 3 },
            ]
        );
        drop(run.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_increments() {
        let counter = Arc::new(AtomicU64::new(10));
        let (tx, _rx) = mpsc::unbounded_channel();
        let run = TimerRun::spawn(1, Arc::clone(&counter), tx);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        run.cancel().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_when_receiver_is_gone() {
        let counter = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let run = TimerRun::spawn(1, Arc::clone(&counter), tx);
        drop(rx);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert!(run.is_finished());
    }
}
