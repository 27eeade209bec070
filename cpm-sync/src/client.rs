//! Client-side replica of the server catalog.
//!
//! The replica registers locally authored bundles, mirrors bundles
//! announced by the server into its own registry, hands newly learned
//! bundles to the asset publisher, and caches the latest trust snapshot.

use crate::assets::{AssetPublisher, InMemoryAssetCatalog};
use crate::protocol::{ReplicationMessage, TrustSnapshotMessage};
use crate::registry::BundleRegistry;
use cpm_types::{Bundle, BundleId, PlayerId};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// One client's registry and trust view.
pub struct ClientReplica<P = InMemoryAssetCatalog> {
    player: PlayerId,
    registry: BundleRegistry,
    own: BTreeSet<BundleId>,
    trust_view: Option<TrustSnapshotMessage>,
    publisher: P,
}

impl ClientReplica {
    /// A replica publishing into an in-memory catalog.
    pub fn in_memory(player: PlayerId) -> Self {
        Self::new(player, InMemoryAssetCatalog::new())
    }
}

impl<P: AssetPublisher> ClientReplica<P> {
    pub fn new(player: PlayerId, publisher: P) -> Self {
        Self {
            player,
            registry: BundleRegistry::new(),
            own: BTreeSet::new(),
            trust_view: None,
            publisher,
        }
    }

    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Latest snapshot from the server, if one has arrived.
    pub fn trust_view(&self) -> Option<&TrustSnapshotMessage> {
        self.trust_view.as_ref()
    }

    /// Registers locally discovered bundles and returns the `SyncRequest`
    /// to send right away.
    pub fn start(&mut self, bundles: impl IntoIterator<Item = Bundle>) -> Vec<ReplicationMessage> {
        for bundle in bundles {
            let id = bundle.id.clone();
            if self.registry.register(bundle).is_inserted() {
                self.own.insert(id);
            } else {
                debug!("Local model '{}' already registered", id);
            }
        }
        debug!("Registered {} local models", self.own.len());
        vec![ReplicationMessage::sync_request()]
    }

    /// Publishes the local bundles and returns their announcements. Call
    /// once the asset pipeline is ready.
    pub fn on_assets_ready(&mut self) -> Vec<ReplicationMessage> {
        let mut out = Vec::with_capacity(self.own.len());
        for id in &self.own {
            if let Some(bundle) = self.registry.get(id) {
                self.publisher.publish(bundle);
                out.push(ReplicationMessage::BundleAnnounce(bundle.clone()));
            }
        }
        out
    }

    /// Handles one message from the server.
    pub fn handle_message(&mut self, message: ReplicationMessage) {
        match message {
            ReplicationMessage::BundleAnnounce(bundle) => {
                let id = bundle.id.clone();
                if self.registry.register(bundle).is_inserted() {
                    if let Some(bundle) = self.registry.get(&id) {
                        self.publisher.publish(bundle);
                    }
                    debug!("Learned model '{}'", id);
                }
            }
            ReplicationMessage::TrustSnapshot(snapshot) => {
                debug!(
                    "Trust view updated: allowed={}, {} trusted models",
                    snapshot.is_player_allowed,
                    snapshot.trusted_ids.len()
                );
                self.trust_view = Some(snapshot);
            }
            ReplicationMessage::SyncRequest(_) => {
                warn!("Dropping SyncRequest sent to client {}", self.player);
            }
        }
    }

    /// Whether a bundle may be offered for selection.
    ///
    /// Only bundles this client authored are ever selectable; bundles
    /// learned from the server are display-only. Own bundles are usable
    /// until the first snapshot arrives.
    pub fn is_usable(&self, id: &BundleId) -> bool {
        if !self.own.contains(id) {
            return false;
        }
        self.trust_view
            .as_ref()
            .is_none_or(|snapshot| snapshot.permits(id))
    }

    /// Own bundles that are currently usable, sorted by id.
    pub fn usable_bundles(&self) -> Vec<&BundleId> {
        self.own.iter().filter(|id| self.is_usable(id)).collect()
    }

    /// Whether this client authored the bundle.
    pub fn is_own(&self, id: &BundleId) -> bool {
        self.own.contains(id)
    }
}

impl<P> fmt::Debug for ClientReplica<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientReplica")
            .field("player", &self.player)
            .field("bundles", &self.registry.len())
            .field("own", &self.own)
            .field("trust_view", &self.trust_view)
            .finish_non_exhaustive()
    }
}
