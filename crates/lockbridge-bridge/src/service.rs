//! Async driving loop for the bridge.
//!
//! [`BridgeService`] moves the [`CommandDispatcher`] into a single tokio task.
//! That task is the only place locks are mutated: requests from any number of
//! [`BridgeClient`]s arrive over a bounded channel and are handled between
//! ticks, so protocol callbacks and the tick loop never interleave.
//!
//! ```text
//! ┌──────────────┐  BridgeRequest  ┌──────────────────────────────┐
//! │ BridgeClient │────────(mpsc)──►│ bridge task                  │
//! └──────────────┘                 │   CommandDispatcher          │
//! ┌──────────────┐                 │   ├─ tick every 100 ms       │
//! │ BridgeClient │────────────────►│   ├─ status every 10 s       │
//! └──────────────┘  ◄──(oneshot)── │   └─ battery check every 30 s│
//!                                  └──────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use lockbridge_bridge::{BridgeCommand, BridgeService, CommandDispatcher, TokioClock};
//! use lockbridge_bridge::protocol::TracingPublisher;
//! use lockbridge_core::{BridgeConfig, ThreadRandom};
//! use lockbridge_hardware::mock::MockPin;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::default();
//!     let (pins, _leds) = MockPin::bank(config.max_locks);
//!     let dispatcher = CommandDispatcher::from_config(
//!         pins,
//!         &config,
//!         Box::new(TokioClock),
//!         Box::new(ThreadRandom),
//!         Box::new(TracingPublisher),
//!     )?;
//!
//!     let handle = BridgeService::new(dispatcher, &config).start();
//!     let reply = handle.client().execute(BridgeCommand::Status).await?;
//!     println!("{}", reply.message);
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::future;
use std::time::Duration;

use lockbridge_core::constants::{
    COMMAND_CHANNEL_CAPACITY, DEFAULT_BATTERY_CHECK_INTERVAL_MS, DEFAULT_STATUS_INTERVAL_MS,
    DEFAULT_TICK_INTERVAL_MS,
};
use lockbridge_core::{BridgeConfig, Clock, LockIdentity, SlotId, TargetState};
use lockbridge_hardware::OutputPin;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::command::BridgeCommand;
use crate::dispatcher::{CommandDispatcher, CommandReply};
use crate::error::{Result, ServiceError};

/// Clock that follows tokio's time source, including paused test time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> std::time::Instant {
        Instant::now().into_std()
    }
}

/// Cadence of the periodic work done by the bridge task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSchedule {
    /// Lock and indicator tick.
    pub tick: Duration,

    /// Status table logging, disabled when `None`.
    pub status: Option<Duration>,

    /// Battery health simulation, disabled when `None`.
    pub battery_check: Option<Duration>,
}

impl Default for ServiceSchedule {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            status: Some(Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS)),
            battery_check: Some(Duration::from_millis(DEFAULT_BATTERY_CHECK_INTERVAL_MS)),
        }
    }
}

impl From<&BridgeConfig> for ServiceSchedule {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            tick: config.tick_interval(),
            status: config.status_interval(),
            battery_check: config.battery_check_interval(),
        }
    }
}

/// A request handled by the bridge task.
#[derive(Debug)]
pub enum BridgeRequest {
    /// Administrative command.
    Command {
        command: BridgeCommand,
        reply: oneshot::Sender<CommandReply>,
    },

    /// Protocol callback: target state changed.
    TargetState {
        identity: LockIdentity,
        target: TargetState,
        reply: oneshot::Sender<lockbridge_core::Result<SlotId>>,
    },

    /// Protocol callback: identify.
    Identify {
        identity: LockIdentity,
        reply: oneshot::Sender<lockbridge_core::Result<SlotId>>,
    },

    /// Reconciliation against an external source of truth.
    ExternalState {
        slot: SlotId,
        locked: bool,
        reply: oneshot::Sender<lockbridge_core::Result<bool>>,
    },
}

/// The bridge driving loop, not yet started.
pub struct BridgeService<P> {
    dispatcher: CommandDispatcher<P>,
    schedule: ServiceSchedule,
}

impl<P: OutputPin + 'static> BridgeService<P> {
    pub fn new(dispatcher: CommandDispatcher<P>, config: &BridgeConfig) -> Self {
        Self::with_schedule(dispatcher, ServiceSchedule::from(config))
    }

    pub fn with_schedule(dispatcher: CommandDispatcher<P>, schedule: ServiceSchedule) -> Self {
        Self {
            dispatcher,
            schedule,
        }
    }

    /// Spawn the bridge task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> BridgeHandle<P> {
        let (request_tx, request_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(self.run(request_rx, shutdown_rx));

        BridgeHandle {
            client: BridgeClient { request_tx },
            shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut requests: mpsc::Receiver<BridgeRequest>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> CommandDispatcher<P> {
        let mut tick = time::interval(self.schedule.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status = self.schedule.status.map(delayed_interval);
        let mut battery = self.schedule.battery_check.map(delayed_interval);

        info!(
            tick_ms = self.schedule.tick.as_millis() as u64,
            locks = self.dispatcher.registry().active_count(),
            "Bridge service started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                request = requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                _ = tick.tick() => {
                    for (slot, outcome) in self.dispatcher.tick() {
                        debug!("Lock {} operation finished: {}", slot, outcome);
                    }
                }
                _ = next_tick(&mut status) => {
                    info!("\n{}", self.dispatcher.status_report());
                }
                _ = next_tick(&mut battery) => {
                    let changed = self.dispatcher.simulate_battery_health();
                    if changed > 0 {
                        debug!(changed, "Battery check changed lock flags");
                    }
                }
            }
        }

        info!("Bridge service stopped");
        self.dispatcher
    }

    fn handle(&mut self, request: BridgeRequest) {
        // A dropped reply receiver means the caller stopped waiting.
        match request {
            BridgeRequest::Command { command, reply } => {
                let _ = reply.send(self.dispatcher.execute(command));
            }
            BridgeRequest::TargetState {
                identity,
                target,
                reply,
            } => {
                let result = self.dispatcher.on_target_state_changed(identity, target);
                if let Err(err) = &result {
                    warn!("Target state for {} not applied: {}", identity, err);
                }
                let _ = reply.send(result);
            }
            BridgeRequest::Identify { identity, reply } => {
                let _ = reply.send(self.dispatcher.on_identify(identity));
            }
            BridgeRequest::ExternalState {
                slot,
                locked,
                reply,
            } => {
                let _ = reply.send(self.dispatcher.on_external_authoritative_state(slot, locked));
            }
        }
    }
}

/// Cloneable sender side of the bridge task.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    request_tx: mpsc::Sender<BridgeRequest>,
}

impl BridgeClient {
    /// Run an administrative command and wait for its reply.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Closed` if the bridge task has stopped.
    pub async fn execute(&self, command: BridgeCommand) -> Result<CommandReply> {
        let (reply, response) = oneshot::channel();
        self.send(BridgeRequest::Command { command, reply }).await?;
        response.await.map_err(|_| ServiceError::Closed)
    }

    /// Parse and run a command line. Parse errors become a failed reply.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Closed` if the bridge task has stopped.
    pub async fn execute_line(&self, line: &str) -> Result<CommandReply> {
        match line.parse::<BridgeCommand>() {
            Ok(command) => self.execute(command).await,
            Err(err) => Ok(CommandReply::from(err)),
        }
    }

    /// Deliver a protocol target-state change.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Lock` when the lock is unknown or busy.
    pub async fn target_state_changed(
        &self,
        identity: LockIdentity,
        target: TargetState,
    ) -> Result<SlotId> {
        let (reply, response) = oneshot::channel();
        self.send(BridgeRequest::TargetState {
            identity,
            target,
            reply,
        })
        .await?;
        Ok(response.await.map_err(|_| ServiceError::Closed)??)
    }

    /// Deliver a protocol identify request.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Lock` when the lock is unknown.
    pub async fn identify(&self, identity: LockIdentity) -> Result<SlotId> {
        let (reply, response) = oneshot::channel();
        self.send(BridgeRequest::Identify { identity, reply }).await?;
        Ok(response.await.map_err(|_| ServiceError::Closed)??)
    }

    /// Report the externally observed state of a lock.
    ///
    /// Resolves to `true` if the lock was idle and error-free and took the
    /// state, `false` if it was left alone.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Lock` when the slot is vacant.
    pub async fn external_state(&self, slot: SlotId, locked: bool) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(BridgeRequest::ExternalState {
            slot,
            locked,
            reply,
        })
        .await?;
        Ok(response.await.map_err(|_| ServiceError::Closed)??)
    }

    async fn send(&self, request: BridgeRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| ServiceError::Closed)
    }
}

/// Owner handle for a running bridge task.
///
/// Dropping the handle also stops the task.
pub struct BridgeHandle<P> {
    client: BridgeClient,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<CommandDispatcher<P>>,
}

impl<P> BridgeHandle<P> {
    /// A new client for sending requests.
    pub fn client(&self) -> BridgeClient {
        self.client.clone()
    }

    /// Stop the bridge task and return the dispatcher it owned.
    ///
    /// Requests already queued but not yet handled are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Join` if the task panicked.
    pub async fn shutdown(self) -> Result<CommandDispatcher<P>> {
        // The task may already have stopped on its own.
        let _ = self.shutdown_tx.send(());
        Ok(self.task.await?)
    }
}

fn delayed_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}
