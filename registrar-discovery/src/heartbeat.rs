//! Background lease renewal.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const STOPPED: u8 = 2;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer running yet
    Idle,
    /// Timer running
    Active,
    /// Stopped for good
    Stopped,
}

/// Periodic timer owned by a registry client.
///
/// The timer starts at most once and keeps running until [`stop`] is called
/// or the scheduler is dropped. Ticks never overlap: the next period only
/// starts counting down after the previous tick future has completed.
///
/// [`stop`]: HeartbeatScheduler::stop
pub struct HeartbeatScheduler {
    interval: Duration,
    state: AtomicU8,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatScheduler {
    /// Create an idle scheduler firing every `interval`
    pub fn new(interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            interval,
            state: AtomicU8::new(IDLE),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::Acquire) {
            IDLE => SchedulerState::Idle,
            ACTIVE => SchedulerState::Active,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SchedulerState::Active
    }

    /// Start the timer if it has never been started.
    ///
    /// Returns `true` when this call started it. The first tick fires one
    /// full interval after the start. Must be called within a Tokio runtime.
    pub fn start<F, Fut>(&self, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // subscribed before claiming the state so a racing stop() is observed
        let mut shutdown = self.shutdown.subscribe();
        if self
            .state
            .compare_exchange(IDLE, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let period = self.interval;

        info!("Starting heartbeat timer (every {:?})", period);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Heartbeat tick");
                        tick().await;
                    }
                    _ = shutdown.changed() => {
                        info!("Heartbeat timer shutting down");
                        break;
                    }
                }
            }
        });

        let mut slot = self.handle.lock();
        if self.state.load(Ordering::Acquire) == STOPPED {
            handle.abort();
        } else {
            *slot = Some(handle);
        }
        true
    }

    /// Stop the timer. A stopped scheduler cannot be started again.
    pub fn stop(&self) {
        let previous = self.state.swap(STOPPED, Ordering::AcqRel);
        if previous != ACTIVE {
            return;
        }

        self.shutdown.send_replace(true);
        if let Some(handle) = self.handle.lock().take() {
            // a tick in flight does not watch the shutdown channel
            handle.abort();
        }
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for HeartbeatScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatScheduler")
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}
