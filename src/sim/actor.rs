//! Tokio task that owns a [`PowerSimulator`] and serializes all access to it.
//!
//! Ticks from the interval timer and commands from handles are processed one
//! at a time on the same task, so a toggle can never interleave with a tick.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::simulator::{PowerSimulator, SimulatorSnapshot};
use super::types::{Channel, TickReport};
use super::usage::UsageLimit;

const MAILBOX_CAPACITY: usize = 64;

/// Returned when the simulator task is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simulator task has stopped")]
pub struct SimStopped;

enum SimMessage {
    Tick(oneshot::Sender<TickReport>),
    Toggle(Channel),
    SetChannel(Channel, bool, oneshot::Sender<bool>),
    StopAll(oneshot::Sender<Vec<Channel>>),
    Snapshot(oneshot::Sender<SimulatorSnapshot>),
    SetUsageLimit(f64, oneshot::Sender<UsageLimit>),
    ClearUsageLimit,
}

/// Cloneable sender side of the simulator task.
#[derive(Debug, Clone)]
pub struct SimHandle {
    tx: mpsc::Sender<SimMessage>,
}

impl SimHandle {
    /// Spawns the task with a timer ticking every `tick_interval_ms`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(sim: PowerSimulator) -> Self {
        let period = Duration::from_millis(sim.config().tick_interval_ms);
        Self::spawn_inner(sim, Some(period))
    }

    /// Spawns the task without a timer; ticks happen only through [`SimHandle::tick`].
    pub fn spawn_manual(sim: PowerSimulator) -> Self {
        Self::spawn_inner(sim, None)
    }

    fn spawn_inner(sim: PowerSimulator, period: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run(sim, rx, period));
        Self { tx }
    }

    pub async fn tick(&self) -> Result<TickReport, SimStopped> {
        self.request(SimMessage::Tick).await
    }

    pub async fn toggle(&self, channel: Channel) -> Result<(), SimStopped> {
        self.tx
            .send(SimMessage::Toggle(channel))
            .await
            .map_err(|_| SimStopped)
    }

    /// Sets a terminal on or off; resolves to whether a toggle happened.
    pub async fn set_channel(&self, channel: Channel, on: bool) -> Result<bool, SimStopped> {
        self.request(|reply| SimMessage::SetChannel(channel, on, reply))
            .await
    }

    /// Switches off every live terminal; resolves to the channels toggled.
    pub async fn stop_all(&self) -> Result<Vec<Channel>, SimStopped> {
        self.request(SimMessage::StopAll).await
    }

    pub async fn snapshot(&self) -> Result<SimulatorSnapshot, SimStopped> {
        self.request(SimMessage::Snapshot).await
    }

    pub async fn set_usage_limit(&self, percent: f64) -> Result<UsageLimit, SimStopped> {
        self.request(|reply| SimMessage::SetUsageLimit(percent, reply))
            .await
    }

    pub async fn clear_usage_limit(&self) -> Result<(), SimStopped> {
        self.tx
            .send(SimMessage::ClearUsageLimit)
            .await
            .map_err(|_| SimStopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SimMessage,
    ) -> Result<T, SimStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| SimStopped)?;
        rx.await.map_err(|_| SimStopped)
    }
}

async fn run(
    mut sim: PowerSimulator,
    mut rx: mpsc::Receiver<SimMessage>,
    period: Option<Duration>,
) {
    info!(timer = period.is_some(), "simulator task started");

    match period {
        Some(period) => {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        sim.tick();
                    }
                    msg = rx.recv() => match msg {
                        Some(msg) => apply(&mut sim, msg),
                        None => break,
                    },
                }
            }
        }
        None => {
            while let Some(msg) = rx.recv().await {
                apply(&mut sim, msg);
            }
        }
    }

    debug!("simulator task stopped");
}

fn apply(sim: &mut PowerSimulator, msg: SimMessage) {
    // A dropped reply receiver only means the caller stopped waiting.
    match msg {
        SimMessage::Tick(reply) => {
            let _ = reply.send(sim.tick());
        }
        SimMessage::Toggle(channel) => sim.toggle(channel),
        SimMessage::SetChannel(channel, on, reply) => {
            let _ = reply.send(sim.set_channel(channel, on));
        }
        SimMessage::StopAll(reply) => {
            let _ = reply.send(sim.stop_all());
        }
        SimMessage::Snapshot(reply) => {
            let _ = reply.send(sim.snapshot());
        }
        SimMessage::SetUsageLimit(percent, reply) => {
            let _ = reply.send(sim.set_usage_limit(percent));
        }
        SimMessage::ClearUsageLimit => sim.clear_usage_limit(),
    }
}
