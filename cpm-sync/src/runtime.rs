//! Async driver for the server hub.
//!
//! The hub itself is single-threaded state. `HubRuntime` owns it on one
//! tokio task, feeds it inputs from an mpsc channel, routes whatever it
//! returns to per-player outbound channels, and runs one processing cycle
//! per interval tick.
//!
//! `HubHandle::serve_connection` bridges one player's framed byte stream to
//! the hub using the length-prefixed codec.

use crate::admin::{AdminCommand, AdminReport};
use crate::codec::{read_message, write_message};
use crate::enforcement::SelectionEvent;
use crate::error::{SyncError, SyncResult};
use crate::protocol::ReplicationMessage;
use crate::server::{Outgoing, ServerHub};
use cpm_types::PlayerId;
use futures::{AsyncRead, AsyncWrite};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Capacity of the runtime's input channel.
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Outbound half of a player's connection.
pub type OutboundSender = mpsc::UnboundedSender<ReplicationMessage>;

/// Inputs accepted by the hub task.
#[derive(Debug)]
pub enum HubInput {
    Connect {
        player: PlayerId,
        outbound: OutboundSender,
    },
    Disconnect {
        player: PlayerId,
    },
    Message {
        from: PlayerId,
        message: ReplicationMessage,
    },
    Selection(SelectionEvent),
    Admin {
        command: AdminCommand,
        reply: oneshot::Sender<SyncResult<AdminReport>>,
    },
    Shutdown,
}

/// Cloneable handle used to talk to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    inputs: mpsc::Sender<HubInput>,
}

impl HubHandle {
    async fn send_input(&self, input: HubInput) -> SyncResult<()> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }

    /// Connects a player and returns the receiver for messages sent to it.
    pub async fn connect(
        &self,
        player: PlayerId,
    ) -> SyncResult<mpsc::UnboundedReceiver<ReplicationMessage>> {
        let (outbound, rx) = mpsc::unbounded_channel();
        self.send_input(HubInput::Connect { player, outbound }).await?;
        Ok(rx)
    }

    pub async fn disconnect(&self, player: PlayerId) -> SyncResult<()> {
        self.send_input(HubInput::Disconnect { player }).await
    }

    /// Delivers a message from a player to the hub.
    pub async fn send(&self, from: PlayerId, message: ReplicationMessage) -> SyncResult<()> {
        self.send_input(HubInput::Message { from, message }).await
    }

    /// Reports that a player's active model changed.
    pub async fn selection_changed(&self, event: SelectionEvent) -> SyncResult<()> {
        self.send_input(HubInput::Selection(event)).await
    }

    /// Runs an admin command and waits for its report.
    pub async fn admin(&self, command: AdminCommand) -> SyncResult<AdminReport> {
        let (reply, rx) = oneshot::channel();
        self.send_input(HubInput::Admin { command, reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)?
    }

    pub async fn shutdown(&self) -> SyncResult<()> {
        self.send_input(HubInput::Shutdown).await
    }

    /// Serves one player's framed connection until it closes.
    ///
    /// Inbound frames are forwarded to the hub until the reader ends or
    /// sends a bad frame, then the player is disconnected. Outbound messages
    /// are written until the hub drops the player.
    pub async fn serve_connection<R, W>(
        &self,
        player: PlayerId,
        mut reader: R,
        mut writer: W,
    ) -> SyncResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut rx = self.connect(player.clone()).await?;
        debug!("Serving framed connection for {}", player);

        let inbound = async {
            let result = self.forward_frames(&player, &mut reader).await;
            if let Err(e) = &result {
                warn!("Closing connection of {}: {}", player, e);
            }
            let closed = self.disconnect(player.clone()).await;
            result.and(closed)
        };

        let outbound = async {
            while let Some(message) = rx.recv().await {
                write_message(&mut writer, &message).await?;
            }
            Ok::<(), SyncError>(())
        };

        let (inbound, outbound) = tokio::join!(inbound, outbound);
        inbound.and(outbound)
    }

    async fn forward_frames<R: AsyncRead + Unpin>(
        &self,
        player: &PlayerId,
        reader: &mut R,
    ) -> SyncResult<()> {
        while let Some(message) = read_message(reader).await? {
            self.send(player.clone(), message).await?;
        }
        Ok(())
    }
}

/// Owns a `ServerHub` and its connections.
pub struct HubRuntime {
    hub: ServerHub,
    inputs: mpsc::Receiver<HubInput>,
    outbound: HashMap<PlayerId, OutboundSender>,
    tick_interval: Duration,
}

impl HubRuntime {
    pub fn new(hub: ServerHub, tick_interval: Duration) -> (Self, HubHandle) {
        let (tx, inputs) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let runtime = Self {
            hub,
            inputs,
            outbound: HashMap::new(),
            tick_interval,
        };
        (runtime, HubHandle { inputs: tx })
    }

    /// Spawns the runtime. The task yields the hub back on shutdown.
    pub fn spawn(hub: ServerHub, tick_interval: Duration) -> (HubHandle, JoinHandle<ServerHub>) {
        let (runtime, handle) = Self::new(hub, tick_interval);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Processes inputs and ticks until shutdown or until every handle is
    /// dropped.
    pub async fn run(mut self) -> ServerHub {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Hub runtime started, tick every {:?}", self.tick_interval);

        loop {
            tokio::select! {
                input = self.inputs.recv() => {
                    match input {
                        Some(HubInput::Shutdown) | None => break,
                        Some(input) => self.handle_input(input),
                    }
                }
                _ = ticker.tick() => {
                    let reverted = self.hub.tick();
                    if reverted > 0 {
                        debug!("Tick executed {} reverts", reverted);
                    }
                }
            }
        }

        info!("Hub runtime stopped");
        self.hub
    }

    fn handle_input(&mut self, input: HubInput) {
        match input {
            HubInput::Connect { player, outbound } => {
                self.hub.connect(player.clone());
                self.outbound.insert(player, outbound);
            }
            HubInput::Disconnect { player } => {
                self.outbound.remove(&player);
                self.hub.disconnect(&player);
            }
            HubInput::Message { from, message } => {
                let out = self.hub.handle_message(&from, message);
                self.route(out);
            }
            HubInput::Selection(event) => {
                self.hub.on_selection_changed(event);
            }
            HubInput::Admin { command, reply } => {
                let result = self.hub.execute_admin(command);
                if let Ok(report) = &result {
                    self.route(report.outgoing.clone());
                }
                if reply.send(result).is_err() {
                    debug!("Admin caller went away before the reply");
                }
            }
            HubInput::Shutdown => {}
        }
    }

    fn route(&mut self, outgoing: Vec<Outgoing>) {
        for Outgoing { recipient, message } in outgoing {
            let Some(sender) = self.outbound.get(&recipient) else {
                debug!("No connection for {}, dropping {}", recipient, message.kind());
                continue;
            };
            if sender.send(message).is_err() {
                warn!("Connection to {} closed, dropping player", recipient);
                self.outbound.remove(&recipient);
                self.hub.disconnect(&recipient);
            }
        }
    }
}
