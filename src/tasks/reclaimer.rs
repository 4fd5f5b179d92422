//! Reclaimer Task
//!
//! Background task that periodically sweeps expired entries and trims the
//! node pool. The interval can be changed while the task runs.
//!
//! Each sweep runs on the blocking pool so that a long one does not stall
//! other tasks on the same worker.

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, StorageError};
use crate::storage::SweepReport;

// == Sweep Target ==
/// Anything the reclaimer can sweep on each tick.
pub trait Sweep: Send + Sync + 'static {
    /// Runs one sweep against the current time.
    fn sweep(&self) -> SweepReport;
}

#[derive(Debug)]
enum Command {
    Reschedule {
        interval: Duration,
        ack: oneshot::Sender<()>,
    },
    Shutdown,
}

// == Reclaimer ==
/// Handle to the background sweep task.
///
/// The task holds only a weak reference to its target, so it ends on its own
/// once the target is dropped. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct Reclaimer {
    commands: mpsc::Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reclaimer {
    /// Spawns the sweep task on the current tokio runtime.
    ///
    /// # Arguments
    /// * `target` - What to sweep on each tick
    /// * `period` - Interval between sweeps; the first sweep runs one period
    ///   after spawning
    ///
    /// # Example
    /// ```ignore
    /// let reclaimer = Reclaimer::spawn(Arc::downgrade(&engine), Duration::from_secs(60))?;
    /// reclaimer.reschedule(Duration::from_secs(5)).await?;
    /// reclaimer.shutdown().await;
    /// ```
    pub fn spawn<S: Sweep>(target: Weak<S>, period: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            StorageError::InvalidConfiguration(format!("reclaimer needs a tokio runtime: {}", e))
        })?;

        // reschedule waits for an ack, so one slot is enough
        let (commands, receiver) = mpsc::channel(1);
        let handle = runtime.spawn(run(target, period, receiver));

        Ok(Self {
            commands,
            handle: Mutex::new(Some(handle)),
        })
    }

    // == Reschedule ==
    /// Replaces the sweep interval.
    ///
    /// Returns once the task has installed the new timer.
    pub async fn reschedule(&self, interval: Duration) -> Result<()> {
        let (ack, installed) = oneshot::channel();
        self.commands
            .send(Command::Reschedule { interval, ack })
            .await
            .map_err(|_| StorageError::ReclaimerStopped)?;
        installed.await.map_err(|_| StorageError::ReclaimerStopped)
    }

    // == Shutdown ==
    /// Stops the task and waits for it to finish. Idempotent.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Returns true while the task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run<S: Sweep>(
    target: Weak<S>,
    period: Duration,
    mut commands: mpsc::Receiver<Command>,
) {
    info!("Starting reclaimer with interval of {:?}", period);
    let mut ticker = new_ticker(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(target) = target.upgrade() else {
                    debug!("Reclaimer target dropped, stopping");
                    break;
                };
                // a sweep after a large expiry burst holds the lock for a while
                match task::spawn_blocking(move || target.sweep()).await {
                    Ok(report) => log_report(&report),
                    Err(e) => warn!("Reclaimer sweep failed: {}", e),
                }
            }
            command = commands.recv() => match command {
                Some(Command::Reschedule { interval, ack }) => {
                    ticker = new_ticker(interval);
                    info!("Reclaimer interval changed to {:?}", interval);
                    let _ = ack.send(());
                }
                Some(Command::Shutdown) | None => {
                    info!("Reclaimer stopped");
                    break;
                }
            },
        }
    }
}

fn log_report(report: &SweepReport) {
    if report.expired > 0 || report.discarded > 0 {
        info!(
            "Reclaimer sweep: removed {} expired entries, discarded {} nodes (live={}, free={})",
            report.expired, report.discarded, report.live, report.free
        );
    } else {
        debug!("Reclaimer sweep: no expired entries found");
    }
}
