//! Tests for registry.rs: first-writer-wins registration.

use cpm_sync::{BundleRegistry, RegisterOutcome};
use cpm_types::{Bundle, BundleId};
use pretty_assertions::assert_eq;

fn bundle(id: &str, texture: &[u8]) -> Bundle {
    Bundle::new(BundleId::new(id), id).with_texture(texture.to_vec())
}

#[test]
fn register_new_id_inserts() {
    let mut registry = BundleRegistry::new();
    assert_eq!(registry.register(bundle("wizard-1", b"a")), RegisterOutcome::Inserted);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&BundleId::new("wizard-1")));
}

#[test]
fn second_registration_keeps_first_content() {
    let mut registry = BundleRegistry::new();
    registry.register(bundle("wizard-1", b"first"));
    let outcome = registry.register(bundle("wizard-1", b"second"));

    assert_eq!(outcome, RegisterOutcome::AlreadyPresent);
    assert!(!outcome.is_inserted());
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get(&BundleId::new("wizard-1")).unwrap().texture,
        b"first".to_vec()
    );
}

#[test]
fn empty_components_are_registrable() {
    let mut registry = BundleRegistry::new();
    let empty = Bundle::new(BundleId::new("blank-1"), "blank");
    assert!(registry.register(empty.clone()).is_inserted());
    assert_eq!(registry.get(&empty.id), Some(&empty));
}

#[test]
fn get_unknown_is_none() {
    let registry = BundleRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.get(&BundleId::new("missing")).is_none());
}

#[test]
fn iter_and_ids_cover_every_bundle() {
    let mut registry = BundleRegistry::new();
    for id in ["a-1", "b-1", "c-1"] {
        registry.register(bundle(id, b""));
    }

    let mut ids: Vec<&str> = registry.ids().map(BundleId::as_str).collect();
    ids.sort();
    assert_eq!(ids, vec!["a-1", "b-1", "c-1"]);
    assert_eq!(registry.iter().count(), 3);
}
