//! Replication and trust engine for custom player models.
//!
//! Players author model bundles on their client. Bundles are replicated to
//! the authoritative server and from there to every other client, while a
//! server-owned allow-list decides which bundles may affect gameplay.
//!
//! # Architecture
//!
//! Every process owns its state explicitly. There are no globals and no
//! locks: each hub or replica runs on a single logic thread.
//!
//! ## Components
//!
//! - **Registry**: id-keyed, first-writer-wins bundle store
//! - **Protocol**: the three replication messages and their framing
//! - **Trust**: player and content-hash allow-lists with an audit trail
//! - **Enforcement**: after-the-fact selection checks with deferred reverts
//! - **Server / Client**: the hub and replica state machines
//! - **Runtime**: tokio driver that owns the hub, ticks it and serves framed
//!   connections
//!
//! ## Replication
//!
//! 1. **Start**: the client registers its local bundles and sends `SyncRequest`
//! 2. **Catalog**: the server answers with every bundle, then one trust snapshot
//! 3. **Announce**: new bundles are registered and relayed to everyone but the author
//! 4. **Trust**: admin changes rebroadcast a fresh snapshot to every client
//!
//! # Example
//!
//! ```
//! use cpm_sync::{GateSettings, ReplicationMessage, ServerHub, TrustStore};
//! use cpm_types::PlayerId;
//!
//! let mut hub = ServerHub::new(TrustStore::in_memory(), GateSettings::default(), "seraph");
//! let player = PlayerId::new("alice");
//! hub.connect(player.clone());
//!
//! let replies = hub.handle_message(&player, ReplicationMessage::sync_request());
//! assert_eq!(replies.len(), 1);
//! ```

pub mod admin;
pub mod assets;
pub mod client;
pub mod codec;
pub mod config;
pub mod enforcement;
mod error;
pub mod loader;
pub mod protocol;
pub mod registry;
pub mod runtime;
pub mod server;
pub mod trust;

pub use admin::{AdminCommand, AdminReport, ComponentSelector};
pub use assets::{AssetPaths, AssetPublisher, InMemoryAssetCatalog};
pub use client::ClientReplica;
pub use codec::{read_message, write_message, MAX_MESSAGE_SIZE};
pub use config::{GateSettings, HubConfig, DEFAULT_MODEL_CODE, DEFAULT_TRUST_FILE};
pub use enforcement::{
    DenyReason, Enforcer, SelectionController, SelectionEvent, TaskQueue, Verdict,
};
pub use error::{SyncError, SyncResult};
pub use loader::{BundleSource, FolderLoader, PackageLoader};
pub use protocol::{ReplicationMessage, SyncRequestMessage, TrustSnapshotMessage};
pub use registry::{BundleRegistry, RegisterOutcome};
pub use runtime::{HubHandle, HubInput, HubRuntime};
pub use server::{Outgoing, ServerHub};
pub use trust::{permitted, AuditAction, AuditEntry, Durability, TrustStore};
