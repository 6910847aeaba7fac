/*!
Repeating tick source and the task that drives the monitor
*/

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::{Stream, StreamExt, wrappers::IntervalStream};
use tracing::{debug, error, info, warn};

use crate::core::tracker::{Monitor, MonitorStatus};

/// One firing of the schedule
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub seq: u64,
    pub at: Instant,
}

/// Ticks every `period`, the first one immediately.
///
/// Ticks that fall due while the consumer is still busy are skipped rather
/// than delivered in a burst.
pub fn tick_stream(period: Duration) -> impl Stream<Item = Tick> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut interval_stream = IntervalStream::new(interval);

    async_stream::stream! {
        let mut seq = 0u64;
        while let Some(at) = interval_stream.next().await {
            seq += 1;
            yield Tick { seq, at };
        }
    }
}

/// Owns the single repeating task that runs the monitor.
///
/// Ticks run one after another inside that task, so a slow tick delays the
/// next one instead of overlapping it.
pub struct Scheduler {
    handle: Option<JoinHandle<Monitor>>,
    shutdown: watch::Sender<bool>,
    status: watch::Receiver<MonitorStatus>,
}

impl Scheduler {
    /// Start ticking `monitor` every `period`
    pub fn spawn(mut monitor: Monitor, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(monitor.status(true));

        info!("🚀 Starting phishing monitor, checking every {:?}", period);

        let handle = tokio::spawn(async move {
            let mut ticks = Box::pin(tick_stream(period));

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                    tick = ticks.next() => {
                        let Some(tick) = tick else {
                            error!("Tick source ended unexpectedly");
                            break;
                        };
                        debug!("Tick #{}", tick.seq);

                        let started = Instant::now();
                        let outcome = monitor.tick().await;
                        debug!("Tick #{} finished: {:?}", tick.seq, outcome);

                        let elapsed = started.elapsed();
                        if elapsed > period {
                            warn!(
                                "⚠️ Tick #{} took {:?}, longer than the {:?} interval; missed ticks skipped",
                                tick.seq, elapsed, period
                            );
                        }

                        let _ = status_tx.send(monitor.status(true));
                    }
                }
            }

            let _ = status_tx.send(monitor.status(false));
            info!("🛑 Scheduler stopped");
            monitor
        });

        Self {
            handle: Some(handle),
            shutdown: shutdown_tx,
            status: status_rx,
        }
    }

    /// Latest published status
    pub fn status(&self) -> MonitorStatus {
        self.status.borrow().clone()
    }

    /// Receiver that is updated after every tick
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and hand the monitor back.
    ///
    /// A tick in progress is allowed to finish first.
    pub async fn stop(mut self) -> Option<Monitor> {
        let _ = self.shutdown.send(true);
        let handle = self.handle.take()?;
        match handle.await {
            Ok(monitor) => Some(monitor),
            Err(e) => {
                error!("Monitor task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_tick_is_immediate() {
        let mut ticks = Box::pin(tick_stream(Duration::from_secs(3600)));
        let first = tokio::time::timeout(Duration::from_millis(500), ticks.next())
            .await
            .expect("first tick should fire immediately")
            .unwrap();
        assert_eq!(first.seq, 1);
    }

    #[tokio::test]
    async fn test_ticks_are_numbered() {
        let mut ticks = Box::pin(tick_stream(Duration::from_millis(10)));
        let first = ticks.next().await.unwrap();
        let second = ticks.next().await.unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        assert!(second.at > first.at);
    }
}
