//! The sync engine: one Tokio task that owns the router, the store and the
//! reaper.
//!
//! Connection tasks never touch session state. They send commands
//! through an [`EngineHandle`]; the actor runs each command, each reaper
//! sweep and each stats tick to completion before looking at the next, so
//! no two mutations ever interleave.

use std::collections::HashMap;
use std::time::Duration;

use muralsync_protocol::{ClientCommand, ConnectionId, ServerEvent, SessionCode};
use muralsync_reaper::ActivityReaper;
use muralsync_session::{InMemorySessionStore, SessionStore, StoreStats};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::{BroadcastRouter, Delivery, EngineConfig, RouterError};

/// Channel the engine pushes a connection's outbound events onto.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to the engine actor.
pub(crate) enum EngineCommand {
    Connect {
        id: ConnectionId,
        sender: ConnectionSender,
    },
    Command {
        from: ConnectionId,
        command: ClientCommand,
    },
    Disconnect {
        id: ConnectionId,
    },
    Stats {
        reply: oneshot::Sender<StoreStats>,
    },
    Sweep {
        reply: oneshot::Sender<Vec<SessionCode>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the running engine. Cheap to clone.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    /// Registers a connection and the channel its events go to.
    pub async fn connect(
        &self,
        id: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(), RouterError> {
        self.send(EngineCommand::Connect { id, sender }).await
    }

    /// Queues a command from a connection (fire-and-forget). Commands from
    /// one connection are applied in the order they are submitted.
    pub async fn submit(&self, from: ConnectionId, command: ClientCommand) -> Result<(), RouterError> {
        self.send(EngineCommand::Command { from, command }).await
    }

    /// Releases a connection's binding and forgets its channel.
    pub async fn disconnect(&self, id: ConnectionId) -> Result<(), RouterError> {
        self.send(EngineCommand::Disconnect { id }).await
    }

    pub async fn stats(&self) -> Result<StoreStats, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Stats { reply }).await?;
        rx.await.map_err(|_| RouterError::Unavailable)
    }

    /// Runs a sweep now, outside the reaper's schedule.
    pub async fn sweep_now(&self) -> Result<Vec<SessionCode>, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Sweep { reply }).await?;
        rx.await.map_err(|_| RouterError::Unavailable)
    }

    /// Stops the engine, dropping every session. Resolves once the store is
    /// cleared.
    pub async fn shutdown(&self) -> Result<(), RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| RouterError::Unavailable)
    }

    /// Whether the engine task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), RouterError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RouterError::Unavailable)
    }
}

/// The actor state. Runs inside a Tokio task.
struct EngineActor<S: SessionStore> {
    router: BroadcastRouter<S>,
    reaper: ActivityReaper,
    senders: HashMap<ConnectionId, ConnectionSender>,
    stats_interval: Option<Interval>,
    receiver: mpsc::Receiver<EngineCommand>,
}

impl<S: SessionStore> EngineActor<S> {
    async fn run(mut self) {
        info!("sync engine started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("all engine handles dropped");
                        break;
                    };
                    if let Some(reply) = self.handle(cmd) {
                        self.stop();
                        let _ = reply.send(());
                        info!("sync engine stopped");
                        return;
                    }
                }
                _ = self.reaper.wait_for_sweep() => {
                    self.reaper.sweep(self.router.store_mut());
                }
                _ = next_tick(&mut self.stats_interval) => {
                    self.log_stats();
                }
            }
        }

        self.stop();
        info!("sync engine stopped");
    }

    /// Handles one command. Returns the reply channel when the command was
    /// a shutdown.
    fn handle(&mut self, cmd: EngineCommand) -> Option<oneshot::Sender<()>> {
        match cmd {
            EngineCommand::Connect { id, sender } => {
                self.router.connect(id);
                self.senders.insert(id, sender);
            }
            EngineCommand::Command { from, command } => {
                let deliveries = self.router.handle(from, command);
                self.deliver(deliveries);
            }
            EngineCommand::Disconnect { id } => {
                self.router.disconnect(id);
                self.senders.remove(&id);
            }
            EngineCommand::Stats { reply } => {
                let _ = reply.send(self.router.stats());
            }
            EngineCommand::Sweep { reply } => {
                let reaped = self.reaper.sweep(self.router.store_mut());
                let _ = reply.send(reaped);
            }
            EngineCommand::Shutdown { reply } => return Some(reply),
        }
        None
    }

    /// Pushes events onto connection channels. A closed channel means the
    /// connection task is already gone; its disconnect is queued behind us.
    fn deliver(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            match self.senders.get(&to) {
                Some(sender) => {
                    if sender.send(event).is_err() {
                        debug!(connection_id = %to, "dropping event for closed connection");
                    }
                }
                None => debug!(connection_id = %to, "no channel for connection"),
            }
        }
    }

    fn log_stats(&self) {
        let stats = self.router.stats();
        if stats.session_count > 0 {
            let reaper = self.reaper.metrics();
            info!(
                sessions = stats.session_count,
                members = stats.total_members,
                connections = self.router.connection_count(),
                sweeps = reaper.total_sweeps,
                reaped = reaper.total_reaped,
                "session stats"
            );
        }
    }

    fn stop(&mut self) {
        self.reaper.pause();
        self.stats_interval = None;
        self.senders.clear();
        self.router.shutdown();
    }
}

/// Resolves on the next stats tick, or never when stats are disabled.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn stats_interval(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

/// Spawns the engine over an in-memory store built from `config.store`.
pub fn spawn_engine(config: EngineConfig) -> EngineHandle {
    let store = InMemorySessionStore::new(config.store.clone());
    spawn_engine_with_store(store, config)
}

/// Spawns the engine over any [`SessionStore`].
///
/// Must be called from within a Tokio runtime.
pub fn spawn_engine_with_store<S: SessionStore>(store: S, config: EngineConfig) -> EngineHandle {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = EngineActor {
        router: BroadcastRouter::new(store),
        reaper: ActivityReaper::new(config.reaper),
        senders: HashMap::new(),
        stats_interval: stats_interval(config.stats_interval),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    EngineHandle { sender: tx }
}
