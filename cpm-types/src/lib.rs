//! Core type definitions for custom player model bundles.
//!
//! This crate defines the plain data shared by the server and every client:
//! - Bundle and player identifiers, including the id derivation rules
//! - The `Bundle` record itself, with base64 byte fields on the wire
//! - SHA-256 content hashes and the component kinds they cover
//! - Fixed-width audit timestamps
//!
//! Nothing here touches the network or the filesystem.

mod bundle;
mod hash;
mod ids;
mod timestamp;

pub use bundle::{base64_bytes, Bundle};
pub use hash::{ComponentKind, ContentHash};
pub use ids::{BundleId, PlayerId, PACKAGED_SUFFIX};
pub use timestamp::{AuditTimestamp, AUDIT_TIMESTAMP_FORMAT};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("unknown component kind: {0}")]
    UnknownComponent(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
