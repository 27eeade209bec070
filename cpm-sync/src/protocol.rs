//! Replication protocol messages.
//!
//! All messages travel over one reliable, ordered channel between the server
//! and each client:
//! 1. `BundleAnnounce` carries a full bundle in either direction
//! 2. `SyncRequest` asks the server for its whole catalog plus a trust view
//! 3. `TrustSnapshot` is the server's per-player trust view
//!
//! There are no acknowledgements, retries or timeouts at this level.

use cpm_types::{Bundle, BundleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A replication protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationMessage {
    /// A bundle, announced by its author or re-announced by the server.
    BundleAnnounce(Bundle),

    /// Client asks for every known bundle and its trust snapshot.
    SyncRequest(SyncRequestMessage),

    /// Server's trust view for the receiving player.
    TrustSnapshot(TrustSnapshotMessage),
}

impl ReplicationMessage {
    /// Builds a `SyncRequest`.
    pub fn sync_request() -> Self {
        Self::SyncRequest(SyncRequestMessage::default())
    }

    /// Short name of the message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BundleAnnounce(_) => "BundleAnnounce",
            Self::SyncRequest(_) => "SyncRequest",
            Self::TrustSnapshot(_) => "TrustSnapshot",
        }
    }

    /// Whether a client may send this message to the server.
    pub fn is_client_to_server(&self) -> bool {
        matches!(self, Self::BundleAnnounce(_) | Self::SyncRequest(_))
    }

    /// Whether the server may send this message to a client.
    pub fn is_server_to_client(&self) -> bool {
        matches!(self, Self::BundleAnnounce(_) | Self::TrustSnapshot(_))
    }
}

/// Catalog request. Carries nothing beyond its presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequestMessage {}

/// Per-player trust view computed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustSnapshotMessage {
    /// Whether the receiving player is on the player allow-list.
    pub is_player_allowed: bool,
    /// Ids of every server-known bundle that passes the content check.
    pub trusted_ids: BTreeSet<BundleId>,
    /// Whether the player gate is enabled on the server.
    pub player_gate_enabled: bool,
    /// Whether the master content gate is enabled on the server.
    pub content_gate_enabled: bool,
}

impl TrustSnapshotMessage {
    /// Whether a bundle is usable under this snapshot.
    ///
    /// A player that fails an enabled player gate can use nothing. Otherwise
    /// an enabled content gate only admits bundles listed in `trusted_ids`.
    pub fn permits(&self, id: &BundleId) -> bool {
        if self.player_gate_enabled && !self.is_player_allowed {
            return false;
        }
        if self.content_gate_enabled && !self.trusted_ids.contains(id) {
            return false;
        }
        true
    }
}
