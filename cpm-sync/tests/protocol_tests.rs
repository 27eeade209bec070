//! Tests for protocol.rs: wire shape and the client usability rule.

use cpm_sync::{ReplicationMessage, TrustSnapshotMessage};
use cpm_types::{Bundle, BundleId};
use serde_json::json;

fn snapshot(allowed: bool, trusted: &[&str], player_gate: bool, content_gate: bool) -> TrustSnapshotMessage {
    TrustSnapshotMessage {
        is_player_allowed: allowed,
        trusted_ids: trusted.iter().map(|id| BundleId::new(*id)).collect(),
        player_gate_enabled: player_gate,
        content_gate_enabled: content_gate,
    }
}

// ── Wire shape ──────────────────────────────────────────────────

#[test]
fn bundle_announce_uses_pascal_case_and_base64() {
    let bundle = Bundle::new(BundleId::new("wizard-a"), "wizard")
        .with_config(b"{}".to_vec())
        .with_shape(b"abc".to_vec());
    let value = serde_json::to_value(ReplicationMessage::BundleAnnounce(bundle)).unwrap();

    assert_eq!(
        value,
        json!({
            "BundleAnnounce": {
                "Id": "wizard-a",
                "ModelName": "wizard",
                "Config": "e30=",
                "Shape": "YWJj",
                "Texture": "",
                "Sound": ""
            }
        })
    );
}

#[test]
fn sync_request_has_no_payload() {
    let value = serde_json::to_value(ReplicationMessage::sync_request()).unwrap();
    assert_eq!(value, json!({ "SyncRequest": {} }));
}

#[test]
fn trust_snapshot_field_names() {
    let message = ReplicationMessage::TrustSnapshot(snapshot(true, &["b-1", "a-1"], true, false));
    let value = serde_json::to_value(message).unwrap();
    assert_eq!(
        value,
        json!({
            "TrustSnapshot": {
                "IsPlayerAllowed": true,
                "TrustedIds": ["a-1", "b-1"],
                "PlayerGateEnabled": true,
                "ContentGateEnabled": false
            }
        })
    );
}

#[test]
fn announce_with_missing_byte_fields_decodes_as_empty() {
    let json = r#"{"BundleAnnounce":{"Id":"x-1","ModelName":"x"}}"#;
    let message: ReplicationMessage = serde_json::from_str(json).unwrap();
    match message {
        ReplicationMessage::BundleAnnounce(bundle) => {
            assert!(bundle.config.is_empty());
            assert!(bundle.sound.is_empty());
        }
        other => panic!("expected BundleAnnounce, got {:?}", other),
    }
}

// ── Direction ───────────────────────────────────────────────────

#[test]
fn message_directions() {
    let announce = ReplicationMessage::BundleAnnounce(Bundle::new(BundleId::new("x"), "x"));
    let request = ReplicationMessage::sync_request();
    let trust = ReplicationMessage::TrustSnapshot(TrustSnapshotMessage::default());

    assert!(announce.is_client_to_server() && announce.is_server_to_client());
    assert!(request.is_client_to_server() && !request.is_server_to_client());
    assert!(!trust.is_client_to_server() && trust.is_server_to_client());
    assert_eq!(trust.kind(), "TrustSnapshot");
}

// ── permits ─────────────────────────────────────────────────────

#[test]
fn open_gates_permit_everything() {
    let view = snapshot(false, &[], false, false);
    assert!(view.permits(&BundleId::new("anything")));
}

#[test]
fn failed_player_gate_permits_nothing() {
    let view = snapshot(false, &["a-1"], true, false);
    assert!(!view.permits(&BundleId::new("a-1")));
}

#[test]
fn content_gate_admits_only_trusted_ids() {
    let view = snapshot(true, &["a-1"], true, true);
    assert!(view.permits(&BundleId::new("a-1")));
    assert!(!view.permits(&BundleId::new("b-1")));
}

#[test]
fn untrusted_player_without_player_gate_uses_trusted_content() {
    let view = snapshot(false, &["a-1"], false, true);
    assert!(view.permits(&BundleId::new("a-1")));
    assert!(!view.permits(&BundleId::new("b-1")));
}
