//! Periodic background jobs.
//!
//! # Responsibilities
//! - Run a job at a fixed interval until stopped
//! - Hand out a [`JobHandle`] that owns the job's lifetime
//!
//! # Design Decisions
//! - Stopping is cooperative: a tick already running finishes, no further
//!   tick starts
//! - `stop` is idempotent and safe to call from any thread
//! - Handlers receive the scheduler as `Arc<dyn Scheduler>` so tests can
//!   drive ticks by hand

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// A unit of periodic work.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub trait Scheduler: Send + Sync {
    /// Start running `job` every `interval`.
    fn every(&self, interval: Duration, job: Job) -> Box<dyn JobHandle>;
}

pub trait JobHandle: Send + Sync {
    fn stop(&self);

    fn is_stopped(&self) -> bool;
}

/// Scheduler backed by `tokio::time::interval`. The first tick fires
/// immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, interval: Duration, job: Job) -> Box<dyn JobHandle> {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        job().await;
                    }
                }
            }
            tracing::debug!("periodic job stopped");
        });

        Box::new(TokioJobHandle { stop_tx })
    }
}

struct TokioJobHandle {
    stop_tx: watch::Sender<bool>,
}

impl JobHandle for TokioJobHandle {
    fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

impl Drop for TokioJobHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(count: Arc<AtomicUsize>) -> Job {
        Arc::new(move || {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = TokioScheduler.every(Duration::from_secs(10), counting_job(Arc::clone(&count)));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_tick_finishes() {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let job: Job = Arc::new(move || {
            let count = Arc::clone(&inner);
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                count.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });

        let handle = TokioScheduler.every(Duration::from_secs(60), job);
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
