//! Server-side enforcement of the trust policy at selection time.
//!
//! Selections are never vetoed. The enforcer observes a selection after the
//! fact and, when it fails the trust check, schedules a corrective revert on
//! the deferred task queue. The revert runs on the next drain, outside the
//! handler that observed the selection.

use crate::config::GateSettings;
use crate::registry::BundleRegistry;
use crate::trust::TrustStore;
use cpm_types::{BundleId, PlayerId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The game-side selection system that corrective reverts act on.
pub trait SelectionController: Send + Sync {
    /// Switches the player's active model back to `default_model`.
    fn reset_to_default(&self, player: &PlayerId, default_model: &str);

    /// Lets the player's next selection through without a trust check.
    fn grant_selection_override(&self, player: &PlayerId);
}

/// A player's active bundle changed.
#[derive(Clone)]
pub struct SelectionEvent {
    pub bundle_id: BundleId,
    pub player: PlayerId,
    pub controller: Arc<dyn SelectionController>,
}

impl SelectionEvent {
    pub fn new(
        bundle_id: BundleId,
        player: PlayerId,
        controller: Arc<dyn SelectionController>,
    ) -> Self {
        Self {
            bundle_id,
            player,
            controller,
        }
    }
}

impl fmt::Debug for SelectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionEvent")
            .field("bundle_id", &self.bundle_id)
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

/// Why a selection was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The player gate is on and the player is not on the allow-list.
    PlayerNotTrusted,
    /// The player is not on the allow-list and the bundle fails the content check.
    BundleNotTrusted,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerNotTrusted => f.write_str("player is not on the white list"),
            Self::BundleNotTrusted => f.write_str("model is not on the white list"),
        }
    }
}

/// Outcome of evaluating a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The selection stands.
    Allowed,
    /// The bundle is not known to the server registry.
    Ignored,
    /// The selection will be reverted on the next drain.
    Denied(DenyReason),
}

impl Verdict {
    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

type Task = Box<dyn FnOnce() + Send>;

/// Work deferred to the next processing cycle.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a task for the next drain.
    pub fn push(&mut self, task: impl FnOnce() + Send + 'static) {
        self.tasks.push(Box::new(task));
    }

    /// Runs every task queued before this call, in order, and returns how
    /// many ran.
    pub fn drain_cycle(&mut self) -> usize {
        let tasks = std::mem::take(&mut self.tasks);
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}

/// Applies the selection policy and owns the deferred revert queue.
#[derive(Debug)]
pub struct Enforcer {
    queue: TaskQueue,
    default_model: String,
}

impl Enforcer {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            queue: TaskQueue::new(),
            default_model: default_model.into(),
        }
    }

    /// Model code that reverts switch players back to.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Decides a selection without scheduling anything.
    pub fn evaluate(
        bundle_id: &BundleId,
        player: &PlayerId,
        registry: &BundleRegistry,
        trust: &TrustStore,
        gates: &GateSettings,
    ) -> Verdict {
        let Some(bundle) = registry.get(bundle_id) else {
            return Verdict::Ignored;
        };

        let player_trusted = trust.is_player_trusted(player);
        if gates.players_white_list && !player_trusted {
            return Verdict::Denied(DenyReason::PlayerNotTrusted);
        }
        if !player_trusted && !trust.is_content_trusted(bundle, gates) {
            return Verdict::Denied(DenyReason::BundleNotTrusted);
        }
        Verdict::Allowed
    }

    /// Evaluates a selection and schedules a corrective revert on deny.
    pub fn on_selection_changed(
        &mut self,
        event: SelectionEvent,
        registry: &BundleRegistry,
        trust: &TrustStore,
        gates: &GateSettings,
    ) -> Verdict {
        let verdict = Self::evaluate(&event.bundle_id, &event.player, registry, trust, gates);
        match verdict {
            Verdict::Denied(reason) => {
                debug!(
                    "Scheduling revert of '{}' for player {}: {}",
                    event.bundle_id, event.player, reason
                );
                let default_model = self.default_model.clone();
                let SelectionEvent {
                    bundle_id,
                    player,
                    controller,
                } = event;
                self.queue.push(move || {
                    controller.reset_to_default(&player, &default_model);
                    controller.grant_selection_override(&player);
                    warn!(
                        "Reverted player {} from model '{}' to '{}': {}",
                        player, bundle_id, default_model, reason
                    );
                });
            }
            Verdict::Ignored => {
                debug!("Selection of unknown model '{}' ignored", event.bundle_id);
            }
            Verdict::Allowed => {}
        }
        verdict
    }

    /// Runs the reverts scheduled before this call.
    pub fn drain(&mut self) -> usize {
        self.queue.drain_cycle()
    }

    /// Number of reverts waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
