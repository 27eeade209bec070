//! Id-keyed store of registered bundles.
//!
//! One registry exists per process (the server and each client). The first
//! registration of an id wins; later registrations with the same id are
//! discarded without looking at their content, which is what keeps every
//! replica byte-identical for a given id.

use cpm_types::{Bundle, BundleId};
use std::collections::HashMap;

/// Result of [`BundleRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The id was new and the bundle is now stored.
    Inserted,
    /// A bundle with this id was already stored; nothing changed.
    AlreadyPresent,
}

impl RegisterOutcome {
    /// True for [`RegisterOutcome::Inserted`].
    #[must_use]
    pub fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Idempotent, first-writer-wins bundle store.
#[derive(Debug, Clone, Default)]
pub struct BundleRegistry {
    bundles: HashMap<BundleId, Bundle>,
}

impl BundleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the bundle if its id is absent.
    pub fn register(&mut self, bundle: Bundle) -> RegisterOutcome {
        if self.bundles.contains_key(&bundle.id) {
            return RegisterOutcome::AlreadyPresent;
        }
        self.bundles.insert(bundle.id.clone(), bundle);
        RegisterOutcome::Inserted
    }

    /// Gets a bundle by id.
    pub fn get(&self, id: &BundleId) -> Option<&Bundle> {
        self.bundles.get(id)
    }

    /// Whether a bundle with this id is stored.
    pub fn contains(&self, id: &BundleId) -> bool {
        self.bundles.contains_key(id)
    }

    /// Iterates over all stored bundles. The order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    /// Iterates over all stored ids. The order is unspecified.
    pub fn ids(&self) -> impl Iterator<Item = &BundleId> {
        self.bundles.keys()
    }

    /// Number of stored bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
