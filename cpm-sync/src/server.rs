//! The authoritative server hub.
//!
//! `ServerHub` owns the server registry, the trust store and the enforcer.
//! It is a plain state machine: handlers return the messages to send and
//! never touch a transport, so every rule can be exercised without one.

use crate::config::{GateSettings, HubConfig};
use crate::enforcement::{Enforcer, SelectionEvent, Verdict};
use crate::protocol::{ReplicationMessage, TrustSnapshotMessage};
use crate::registry::{BundleRegistry, RegisterOutcome};
use crate::trust::TrustStore;
use cpm_types::{Bundle, BundleId, PlayerId};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// A message addressed to one connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub recipient: PlayerId,
    pub message: ReplicationMessage,
}

impl Outgoing {
    pub fn new(recipient: PlayerId, message: ReplicationMessage) -> Self {
        Self { recipient, message }
    }
}

/// Server-side replication and trust state.
#[derive(Debug)]
pub struct ServerHub {
    registry: BundleRegistry,
    owners: HashMap<BundleId, PlayerId>,
    trust: TrustStore,
    gates: GateSettings,
    connected: BTreeSet<PlayerId>,
    enforcer: Enforcer,
}

impl ServerHub {
    pub fn new(trust: TrustStore, gates: GateSettings, default_model: impl Into<String>) -> Self {
        Self {
            registry: BundleRegistry::new(),
            owners: HashMap::new(),
            trust,
            gates,
            connected: BTreeSet::new(),
            enforcer: Enforcer::new(default_model),
        }
    }

    /// Builds a hub from config, opening the configured trust file.
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            TrustStore::open(&config.trust_file),
            config.gates,
            config.default_model.clone(),
        )
    }

    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    pub fn trust(&self) -> &TrustStore {
        &self.trust
    }

    pub(crate) fn trust_mut(&mut self) -> &mut TrustStore {
        &mut self.trust
    }

    pub fn gates(&self) -> &GateSettings {
        &self.gates
    }

    /// Player whose announcement first registered the bundle.
    pub fn owner_of(&self, id: &BundleId) -> Option<&PlayerId> {
        self.owners.get(id)
    }

    /// Registered bundles first announced by `owner`.
    pub fn bundles_owned_by<'a>(&'a self, owner: &'a PlayerId) -> impl Iterator<Item = &'a Bundle> {
        self.registry
            .iter()
            .filter(move |bundle| self.owners.get(&bundle.id) == Some(owner))
    }

    pub fn connected_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.connected.iter()
    }

    pub fn is_connected(&self, player: &PlayerId) -> bool {
        self.connected.contains(player)
    }

    /// Marks a player as connected. Returns false if it already was.
    pub fn connect(&mut self, player: PlayerId) -> bool {
        let added = self.connected.insert(player.clone());
        if added {
            info!("Player {} connected", player);
        }
        added
    }

    /// Marks a player as gone. Returns false if it was not connected.
    pub fn disconnect(&mut self, player: &PlayerId) -> bool {
        let removed = self.connected.remove(player);
        if removed {
            info!("Player {} disconnected", player);
        }
        removed
    }

    /// Handles one inbound message and returns what to send in response.
    pub fn handle_message(&mut self, from: &PlayerId, message: ReplicationMessage) -> Vec<Outgoing> {
        match message {
            ReplicationMessage::BundleAnnounce(bundle) => self.on_bundle_announce(from, bundle),
            ReplicationMessage::SyncRequest(_) => self.on_sync_request(from),
            ReplicationMessage::TrustSnapshot(_) => {
                warn!("Dropping TrustSnapshot sent to the server by {}", from);
                Vec::new()
            }
        }
    }

    fn on_bundle_announce(&mut self, from: &PlayerId, bundle: Bundle) -> Vec<Outgoing> {
        let id = bundle.id.clone();
        if self.registry.register(bundle.clone()) == RegisterOutcome::AlreadyPresent {
            debug!("Model '{}' from {} already registered", id, from);
            return Vec::new();
        }
        self.owners.insert(id.clone(), from.clone());
        debug!("Registered model '{}' from {}", id, from);

        self.connected
            .iter()
            .filter(|player| *player != from)
            .map(|player| {
                Outgoing::new(
                    player.clone(),
                    ReplicationMessage::BundleAnnounce(bundle.clone()),
                )
            })
            .collect()
    }

    fn on_sync_request(&self, from: &PlayerId) -> Vec<Outgoing> {
        let mut out: Vec<Outgoing> = self
            .registry
            .iter()
            .map(|bundle| {
                Outgoing::new(from.clone(), ReplicationMessage::BundleAnnounce(bundle.clone()))
            })
            .collect();
        out.push(Outgoing::new(
            from.clone(),
            ReplicationMessage::TrustSnapshot(self.snapshot_for(from)),
        ));
        debug!("Answered SyncRequest from {} with {} models", from, out.len() - 1);
        out
    }

    /// Trust view for one player.
    pub fn snapshot_for(&self, player: &PlayerId) -> TrustSnapshotMessage {
        self.trust.snapshot_for(player, &self.registry, &self.gates)
    }

    /// A fresh snapshot for every connected player.
    pub fn broadcast_trust_snapshots(&self) -> Vec<Outgoing> {
        self.connected
            .iter()
            .map(|player| {
                Outgoing::new(
                    player.clone(),
                    ReplicationMessage::TrustSnapshot(self.snapshot_for(player)),
                )
            })
            .collect()
    }

    /// Checks a selection; denied selections are reverted on the next tick.
    pub fn on_selection_changed(&mut self, event: SelectionEvent) -> Verdict {
        self.enforcer
            .on_selection_changed(event, &self.registry, &self.trust, &self.gates)
    }

    /// Runs one processing cycle. Returns the number of reverts executed.
    pub fn tick(&mut self) -> usize {
        self.enforcer.drain()
    }

    /// Reverts waiting for the next tick.
    pub fn pending_reverts(&self) -> usize {
        self.enforcer.pending()
    }
}
