//! Async runtime for a guard
//!
//! [`GuardDriver`] owns an [`AccessGuard`] on a single tokio task. Commands
//! arrive over an mpsc channel and are applied one at a time, so PIN
//! submissions never overlap. After every event the driver reconciles the
//! countdown timers with the guard's phase: at most one timer per countdown,
//! and a timer is dropped the moment its phase is left.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{GuardError, Result};
use crate::guard::{AccessGuard, GuardPhase, GuardState, SubmitOutcome};
use crate::notification::Notification;
use crate::timer::{CountdownKind, CountdownTimer, TimerTick};

/// Countdown resolution
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Pending command capacity
const COMMAND_CAPACITY: usize = 32;

/// Notification backlog per subscriber
const NOTIFICATION_CAPACITY: usize = 64;

/// Requests accepted by the driver
#[derive(Debug)]
pub enum GuardCommand {
    SubmitPin {
        pin: String,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    RequestTemporaryUnlock {
        reply: oneshot::Sender<bool>,
    },
    Logout {
        reply: oneshot::Sender<bool>,
    },
    /// The router changed the shared route
    RouteChanged,
    IsContentVisible {
        reply: oneshot::Sender<bool>,
    },
    State {
        reply: oneshot::Sender<GuardState>,
    },
    Shutdown,
}

/// Cloneable client side of a running driver
#[derive(Clone, Debug)]
pub struct GuardHandle {
    commands: mpsc::Sender<GuardCommand>,
    notifications: broadcast::Sender<Notification>,
}

impl GuardHandle {
    async fn send(&self, command: GuardCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GuardError::DriverStopped)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> GuardCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| GuardError::DriverStopped)
    }

    pub async fn submit_pin(&self, pin: impl Into<String>) -> Result<SubmitOutcome> {
        let pin = pin.into();
        self.request(|reply| GuardCommand::SubmitPin { pin, reply })
            .await
    }

    pub async fn request_temporary_unlock(&self) -> Result<bool> {
        self.request(|reply| GuardCommand::RequestTemporaryUnlock { reply })
            .await
    }

    pub async fn logout(&self) -> Result<bool> {
        self.request(|reply| GuardCommand::Logout { reply }).await
    }

    /// Tell the guard the shared route changed
    pub async fn route_changed(&self) -> Result<()> {
        self.send(GuardCommand::RouteChanged).await
    }

    pub async fn is_content_visible(&self) -> Result<bool> {
        self.request(|reply| GuardCommand::IsContentVisible { reply })
            .await
    }

    pub async fn state(&self) -> Result<GuardState> {
        self.request(|reply| GuardCommand::State { reply }).await
    }

    /// Receive every notification published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(GuardCommand::Shutdown).await
    }
}

enum DriverEvent {
    Command(Option<GuardCommand>),
    Tick(TimerTick),
}

/// Owns a guard and its countdown timers
pub struct GuardDriver {
    guard: AccessGuard,
    commands: mpsc::Receiver<GuardCommand>,
    ticks_tx: mpsc::UnboundedSender<TimerTick>,
    ticks_rx: mpsc::UnboundedReceiver<TimerTick>,
    notifications: broadcast::Sender<Notification>,
    lockout_timer: Option<CountdownTimer>,
    unlock_timer: Option<CountdownTimer>,
    next_generation: u64,
}

impl GuardDriver {
    pub fn new(guard: AccessGuard) -> (Self, GuardHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let handle = GuardHandle {
            commands: commands_tx,
            notifications: notifications.clone(),
        };
        let driver = Self {
            guard,
            commands,
            ticks_tx,
            ticks_rx,
            notifications,
            lockout_timer: None,
            unlock_timer: None,
            next_generation: 0,
        };
        (driver, handle)
    }

    /// Spawn the driver on the current runtime
    pub fn spawn(guard: AccessGuard) -> (GuardHandle, JoinHandle<()>) {
        let (driver, handle) = Self::new(guard);
        let task = tokio::spawn(driver.run());
        (handle, task)
    }

    /// Process commands and ticks until shutdown or every handle is dropped
    pub async fn run(mut self) {
        self.settle();

        loop {
            let event = tokio::select! {
                command = self.commands.recv() => DriverEvent::Command(command),
                Some(tick) = self.ticks_rx.recv() => DriverEvent::Tick(tick),
            };

            match event {
                DriverEvent::Command(None) | DriverEvent::Command(Some(GuardCommand::Shutdown)) => {
                    break;
                }
                DriverEvent::Command(Some(command)) => self.handle_command(command).await,
                DriverEvent::Tick(tick) => self.handle_tick(tick),
            }

            self.settle();
        }

        info!("Guard driver stopped");
    }

    async fn handle_command(&mut self, command: GuardCommand) {
        match command {
            GuardCommand::SubmitPin { pin, reply } => {
                let outcome = self.guard.submit_pin(&pin).await;
                let _ = reply.send(outcome);
            }
            GuardCommand::RequestTemporaryUnlock { reply } => {
                let _ = reply.send(self.guard.request_temporary_unlock());
            }
            GuardCommand::Logout { reply } => {
                let _ = reply.send(self.guard.logout());
            }
            GuardCommand::RouteChanged => {
                self.guard.sync_route();
            }
            GuardCommand::IsContentVisible { reply } => {
                let _ = reply.send(self.guard.is_content_visible());
            }
            GuardCommand::State { reply } => {
                self.guard.sync_route();
                let _ = reply.send(self.guard.state());
            }
            GuardCommand::Shutdown => {}
        }
    }

    fn handle_tick(&mut self, tick: TimerTick) {
        let current = match tick.kind {
            CountdownKind::Lockout => self.lockout_timer.as_ref(),
            CountdownKind::TemporaryUnlock => self.unlock_timer.as_ref(),
        };
        if !current.is_some_and(|timer| timer.owns(&tick)) {
            debug!("Dropping stale {:?} tick", tick.kind);
            return;
        }

        match tick.kind {
            CountdownKind::Lockout => {
                self.guard.tick_lockout();
            }
            CountdownKind::TemporaryUnlock => {
                self.guard.tick_temporary_unlock();
            }
        }
    }

    /// Publish queued notifications and line the timers up with the phase
    fn settle(&mut self) {
        for notification in self.guard.take_notifications() {
            // No subscribers is fine
            let _ = self.notifications.send(notification);
        }

        let locked = matches!(self.guard.phase(), GuardPhase::Locked { .. });
        let unlocked = matches!(self.guard.phase(), GuardPhase::TemporarilyUnlocked { .. });

        let lockout_timer = self.lockout_timer.take();
        self.lockout_timer = self.reconcile(lockout_timer, locked, CountdownKind::Lockout);

        let unlock_timer = self.unlock_timer.take();
        self.unlock_timer = self.reconcile(unlock_timer, unlocked, CountdownKind::TemporaryUnlock);
    }

    fn reconcile(
        &mut self,
        timer: Option<CountdownTimer>,
        wanted: bool,
        kind: CountdownKind,
    ) -> Option<CountdownTimer> {
        match (timer, wanted) {
            (Some(timer), true) => Some(timer),
            (None, true) => {
                self.next_generation += 1;
                Some(CountdownTimer::start(
                    kind,
                    self.next_generation,
                    TICK_PERIOD,
                    self.ticks_tx.clone(),
                ))
            }
            (Some(timer), false) => {
                timer.cancel();
                None
            }
            (None, false) => None,
        }
    }
}
