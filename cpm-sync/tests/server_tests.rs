//! Tests for server.rs and client.rs together: end-to-end replication.

use cpm_sync::{
    ClientReplica, GateSettings, Outgoing, ReplicationMessage, ServerHub, TrustSnapshotMessage,
    TrustStore,
};
use cpm_types::{Bundle, BundleId, PlayerId};
use pretty_assertions::assert_eq;

fn hub() -> ServerHub {
    ServerHub::new(TrustStore::in_memory(), GateSettings::default(), "seraph")
}

/// Delivers every message addressed to `client`.
fn deliver(outgoing: &[Outgoing], client: &mut ClientReplica) {
    let me = client.player().clone();
    for out in outgoing.iter().filter(|o| o.recipient == me) {
        client.handle_message(out.message.clone());
    }
}

fn wizard_a(owner: &PlayerId) -> Bundle {
    // texture file missing on disk
    Bundle::new(BundleId::local("wizard", owner), "wizard")
        .with_config(b"{}".to_vec())
        .with_shape(b"{\"elements\":[]}".to_vec())
        .with_sound(b"ogg".to_vec())
}

#[test]
fn announce_is_relayed_to_everyone_but_the_origin() {
    let alice = PlayerId::new("A");
    let bob = PlayerId::new("B");
    let carol = PlayerId::new("C");
    let mut hub = hub();
    for p in [&alice, &bob, &carol] {
        hub.connect(p.clone());
    }

    let bundle = wizard_a(&alice);
    let out = hub.handle_message(&alice, ReplicationMessage::BundleAnnounce(bundle.clone()));

    let recipients: Vec<&PlayerId> = out.iter().map(|o| &o.recipient).collect();
    assert_eq!(recipients, vec![&bob, &carol]);
    assert!(out
        .iter()
        .all(|o| o.message == ReplicationMessage::BundleAnnounce(bundle.clone())));
    assert_eq!(hub.owner_of(&bundle.id), Some(&alice));
}

#[test]
fn wizard_a_end_to_end() {
    let alice = PlayerId::new("A");
    let bob = PlayerId::new("B");
    let mut hub = hub();
    hub.connect(alice.clone());
    hub.connect(bob.clone());

    let mut client_a = ClientReplica::in_memory(alice.clone());
    let mut client_b = ClientReplica::in_memory(bob.clone());

    let bundle = wizard_a(&alice);
    let first = client_a.start([bundle.clone()]);
    assert_eq!(first, vec![ReplicationMessage::sync_request()]);

    let announces = client_a.on_assets_ready();
    assert_eq!(announces.len(), 1);

    let mut relayed = Vec::new();
    for message in announces {
        relayed.extend(hub.handle_message(&alice, message));
    }
    assert!(relayed.iter().all(|o| o.recipient == bob));
    deliver(&relayed, &mut client_b);

    let on_b = client_b.registry().get(&bundle.id).unwrap();
    assert!(on_b.texture.is_empty());
    assert_eq!(on_b, &bundle);
    assert!(!client_b.is_own(&bundle.id));
    assert!(client_a.is_own(&bundle.id));

    // A replay from B is a no-op on the server.
    let replay = hub.handle_message(&bob, ReplicationMessage::BundleAnnounce(on_b.clone()));
    assert!(replay.is_empty());
    assert_eq!(hub.registry().len(), 1);
    assert_eq!(hub.owner_of(&bundle.id), Some(&alice));
}

#[test]
fn first_announce_wins_on_the_server() {
    let alice = PlayerId::new("A");
    let bob = PlayerId::new("B");
    let mut hub = hub();
    let id = BundleId::new("shared-1");

    hub.handle_message(
        &alice,
        ReplicationMessage::BundleAnnounce(Bundle::new(id.clone(), "shared").with_shape(b"one".to_vec())),
    );
    let out = hub.handle_message(
        &bob,
        ReplicationMessage::BundleAnnounce(Bundle::new(id.clone(), "shared").with_shape(b"two".to_vec())),
    );

    assert!(out.is_empty());
    assert_eq!(hub.registry().get(&id).unwrap().shape, b"one".to_vec());
}

#[test]
fn sync_request_on_empty_server_yields_only_a_snapshot() {
    let player = PlayerId::new("newcomer");
    let mut hub = hub();
    hub.connect(player.clone());

    let out = hub.handle_message(&player, ReplicationMessage::sync_request());

    assert_eq!(
        out,
        vec![Outgoing::new(
            player.clone(),
            ReplicationMessage::TrustSnapshot(TrustSnapshotMessage {
                is_player_allowed: false,
                trusted_ids: Default::default(),
                player_gate_enabled: true,
                content_gate_enabled: true,
            })
        )]
    );
}

#[test]
fn sync_request_sends_catalog_then_one_snapshot() {
    let alice = PlayerId::new("A");
    let late = PlayerId::new("late");
    let mut hub = hub();
    for name in ["x", "y", "z"] {
        hub.handle_message(
            &alice,
            ReplicationMessage::BundleAnnounce(Bundle::new(BundleId::new(name), name)),
        );
    }
    hub.connect(late.clone());

    let out = hub.handle_message(&late, ReplicationMessage::sync_request());
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|o| o.recipient == late));
    assert!(out[..3]
        .iter()
        .all(|o| matches!(o.message, ReplicationMessage::BundleAnnounce(_))));
    assert!(matches!(out[3].message, ReplicationMessage::TrustSnapshot(_)));

    let mut client = ClientReplica::in_memory(late.clone());
    client.start(Vec::<Bundle>::new());
    deliver(&out, &mut client);
    assert_eq!(client.registry().len(), 3);
    assert!(client.trust_view().is_some());
}

#[test]
fn trust_snapshot_sent_to_server_is_dropped() {
    let mut hub = hub();
    let out = hub.handle_message(
        &PlayerId::new("A"),
        ReplicationMessage::TrustSnapshot(TrustSnapshotMessage::default()),
    );
    assert!(out.is_empty());
}

#[test]
fn broadcast_covers_connected_players_only() {
    let mut hub = hub();
    let alice = PlayerId::new("A");
    let bob = PlayerId::new("B");
    hub.connect(alice.clone());
    hub.connect(bob.clone());
    assert!(hub.disconnect(&bob));
    assert!(!hub.disconnect(&bob));

    let out = hub.broadcast_trust_snapshots();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].recipient, alice);
}
