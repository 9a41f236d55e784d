//! Cancellable one-second countdown timers
//!
//! A [`CountdownTimer`] is a tokio task that sends a [`TimerTick`] every
//! period until it is dropped. Ticks carry the generation of the timer that
//! produced them so a tick already queued when its timer was cancelled can
//! be recognised and discarded.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Which countdown a timer drives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CountdownKind {
    Lockout,
    TemporaryUnlock,
}

/// One elapsed period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerTick {
    pub kind: CountdownKind,
    pub generation: u64,
}

/// Owned handle to a running countdown; dropping it stops the ticks
#[derive(Debug)]
pub struct CountdownTimer {
    kind: CountdownKind,
    generation: u64,
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Start ticking every `period`, first tick one period from now
    pub fn start(
        kind: CountdownKind,
        generation: u64,
        period: Duration,
        ticks: mpsc::UnboundedSender<TimerTick>,
    ) -> Self {
        debug!("Starting {:?} timer (generation {})", kind, generation);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                interval.tick().await;
                if ticks.send(TimerTick { kind, generation }).is_err() {
                    break;
                }
            }
        });

        Self {
            kind,
            generation,
            handle,
        }
    }

    /// Whether `tick` was produced by this timer
    pub fn owns(&self, tick: &TimerTick) -> bool {
        tick.kind == self.kind && tick.generation == self.generation
    }

    /// Stop ticking
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        debug!(
            "Stopping {:?} timer (generation {})",
            self.kind, self.generation
        );
        self.handle.abort();
    }
}
