//! Tests for enforcement.rs: selection policy and deferred reverts.

use cpm_sync::{
    DenyReason, GateSettings, ReplicationMessage, SelectionController, SelectionEvent, ServerHub,
    TaskQueue, TrustStore, Verdict,
};
use cpm_types::{Bundle, BundleId, PlayerId};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingController {
    calls: Mutex<Vec<String>>,
}

impl RecordingController {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl SelectionController for RecordingController {
    fn reset_to_default(&self, player: &PlayerId, default_model: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("reset {player} {default_model}"));
    }

    fn grant_selection_override(&self, player: &PlayerId) {
        self.calls.lock().unwrap().push(format!("override {player}"));
    }
}

fn wizard() -> Bundle {
    Bundle::new(BundleId::new("wizard-a"), "wizard").with_texture(b"png".to_vec())
}

fn hub_with(gates: GateSettings) -> ServerHub {
    let mut hub = ServerHub::new(TrustStore::in_memory(), gates, "seraph");
    hub.handle_message(
        &PlayerId::new("author"),
        ReplicationMessage::BundleAnnounce(wizard()),
    );
    hub
}

fn select(hub: &mut ServerHub, player: &str, controller: &Arc<RecordingController>) -> Verdict {
    hub.on_selection_changed(SelectionEvent::new(
        wizard().id,
        PlayerId::new(player),
        controller.clone(),
    ))
}

// ── Policy ──────────────────────────────────────────────────────

#[test]
fn untrusted_player_is_denied_under_player_gate() {
    let controller = Arc::new(RecordingController::default());
    let mut hub = hub_with(GateSettings::default());

    let verdict = select(&mut hub, "mallory", &controller);
    assert_eq!(verdict, Verdict::Denied(DenyReason::PlayerNotTrusted));
}

#[test]
fn trusted_player_is_allowed_regardless_of_content() {
    let controller = Arc::new(RecordingController::default());
    let mut hub = hub_with(GateSettings::default());
    hub.admin_add_player(&PlayerId::new("alice"), "alice");

    assert_eq!(select(&mut hub, "alice", &controller), Verdict::Allowed);
    assert_eq!(hub.pending_reverts(), 0);
}

#[test]
fn untrusted_player_needs_trusted_content_without_player_gate() {
    let controller = Arc::new(RecordingController::default());
    let gates = GateSettings {
        players_white_list: false,
        ..GateSettings::default()
    };
    let mut hub = hub_with(gates);

    assert_eq!(
        select(&mut hub, "bob", &controller),
        Verdict::Denied(DenyReason::BundleNotTrusted)
    );

    hub.admin_add_model(&PlayerId::new("author"), "author", "wizard", None)
        .unwrap();
    assert_eq!(select(&mut hub, "bob", &controller), Verdict::Allowed);
}

#[test]
fn open_gates_allow_everyone() {
    let controller = Arc::new(RecordingController::default());
    let mut hub = hub_with(GateSettings::open());
    assert_eq!(select(&mut hub, "anyone", &controller), Verdict::Allowed);
}

#[test]
fn unknown_bundle_is_ignored() {
    let controller = Arc::new(RecordingController::default());
    let mut hub = hub_with(GateSettings::default());

    let verdict = hub.on_selection_changed(SelectionEvent::new(
        BundleId::new("not-registered"),
        PlayerId::new("mallory"),
        controller.clone(),
    ));
    assert_eq!(verdict, Verdict::Ignored);
    assert_eq!(hub.pending_reverts(), 0);
}

// ── Deferred revert ─────────────────────────────────────────────

#[test]
fn revert_waits_for_the_next_tick() {
    let controller = Arc::new(RecordingController::default());
    let mut hub = hub_with(GateSettings::default());

    assert!(select(&mut hub, "mallory", &controller).is_denied());
    assert!(controller.calls().is_empty());
    assert_eq!(hub.pending_reverts(), 1);

    assert_eq!(hub.tick(), 1);
    assert_eq!(
        controller.calls(),
        vec!["reset mallory seraph".to_string(), "override mallory".to_string()]
    );
    assert_eq!(hub.tick(), 0);
}

#[test]
fn task_queue_runs_tasks_in_order_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut queue = TaskQueue::new();
    for name in ["first", "second"] {
        let log = log.clone();
        queue.push(move || log.lock().unwrap().push(name));
    }

    assert_eq!(queue.len(), 2);
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(queue.drain_cycle(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    assert!(queue.is_empty());
    assert_eq!(queue.drain_cycle(), 0);
}
