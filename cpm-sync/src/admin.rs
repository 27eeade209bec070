//! Operator commands against the server's trust store.
//!
//! Each command mutates the store, which persists itself, and returns the
//! trust snapshots to rebroadcast to every connected client.

use crate::error::{SyncError, SyncResult};
use crate::server::{Outgoing, ServerHub};
use crate::trust::{AuditAction, Durability};
use cpm_types::{Bundle, ComponentKind, PlayerId};
use tracing::info;

/// Which components of a model a command applies to.
///
/// Parsed from a flag string: `t` texture, `h` shape, `o` sound. Case and
/// unknown characters are ignored; an empty string selects the whole model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSelector {
    pub texture: bool,
    pub shape: bool,
    pub sound: bool,
}

impl ComponentSelector {
    pub const WHOLE_MODEL: Self = Self {
        texture: true,
        shape: true,
        sound: true,
    };

    pub fn parse(flags: Option<&str>) -> SyncResult<Self> {
        let flags = flags.unwrap_or_default().to_lowercase();
        if flags.is_empty() {
            return Ok(Self::WHOLE_MODEL);
        }
        let selector = Self {
            texture: flags.contains('t'),
            shape: flags.contains('h'),
            sound: flags.contains('o'),
        };
        if selector.kinds().is_empty() {
            return Err(SyncError::InvalidSelector(flags));
        }
        Ok(selector)
    }

    /// Selected kinds, texture first, then shape, then sound.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        [
            (self.texture, ComponentKind::Texture),
            (self.shape, ComponentKind::Shape),
            (self.sound, ComponentKind::Sound),
        ]
        .into_iter()
        .filter_map(|(selected, kind)| selected.then_some(kind))
        .collect()
    }

    pub fn is_whole_model(&self) -> bool {
        *self == Self::WHOLE_MODEL
    }
}

/// An operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    AddPlayer {
        player: PlayerId,
        name: String,
    },
    RemovePlayer {
        player: PlayerId,
        name: String,
    },
    AddModel {
        owner: PlayerId,
        owner_name: String,
        model: String,
        flags: Option<String>,
    },
    RemoveModel {
        owner: PlayerId,
        owner_name: String,
        model: String,
        flags: Option<String>,
    },
}

/// Result of a successful admin command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminReport {
    /// Operator-facing summary.
    pub message: String,
    /// Whether the change reached the trust file.
    pub durability: Durability,
    /// Snapshots for every connected player.
    pub outgoing: Vec<Outgoing>,
}

impl ServerHub {
    /// Runs an operator command.
    pub fn execute_admin(&mut self, command: AdminCommand) -> SyncResult<AdminReport> {
        match command {
            AdminCommand::AddPlayer { player, name } => Ok(self.admin_add_player(&player, &name)),
            AdminCommand::RemovePlayer { player, name } => {
                Ok(self.admin_remove_player(&player, &name))
            }
            AdminCommand::AddModel {
                owner,
                owner_name,
                model,
                flags,
            } => self.admin_add_model(&owner, &owner_name, &model, flags.as_deref()),
            AdminCommand::RemoveModel {
                owner,
                owner_name,
                model,
                flags,
            } => self.admin_remove_model(&owner, &owner_name, &model, flags.as_deref()),
        }
    }

    pub fn admin_add_player(&mut self, player: &PlayerId, name: &str) -> AdminReport {
        let durability = self.trust_mut().add_player(player, name);
        self.report(format!("Player '{name}' was added to white list"), durability)
    }

    pub fn admin_remove_player(&mut self, player: &PlayerId, name: &str) -> AdminReport {
        let durability = self.trust_mut().remove_player(player, name);
        self.report(format!("Player '{name}' was removed from white list"), durability)
    }

    /// Allows the selected components of every model `owner` announced under
    /// the given name or id.
    pub fn admin_add_model(
        &mut self,
        owner: &PlayerId,
        owner_name: &str,
        model: &str,
        flags: Option<&str>,
    ) -> SyncResult<AdminReport> {
        self.model_command(owner, owner_name, model, flags, AuditAction::Added)
    }

    /// Revokes the selected components of every matching model.
    pub fn admin_remove_model(
        &mut self,
        owner: &PlayerId,
        owner_name: &str,
        model: &str,
        flags: Option<&str>,
    ) -> SyncResult<AdminReport> {
        self.model_command(owner, owner_name, model, flags, AuditAction::Removed)
    }

    /// Models owned by `owner` whose model name or config display name
    /// matches, ignoring case.
    pub fn find_owned_models(&self, owner: &PlayerId, model: &str) -> Vec<Bundle> {
        let wanted = model.to_lowercase();
        let mut found: Vec<Bundle> = self
            .bundles_owned_by(owner)
            .filter(|bundle| {
                bundle.model_name.to_lowercase() == wanted
                    || bundle
                        .display_name()
                        .is_some_and(|name| name.to_lowercase() == wanted)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    fn model_command(
        &mut self,
        owner: &PlayerId,
        owner_name: &str,
        model: &str,
        flags: Option<&str>,
        action: AuditAction,
    ) -> SyncResult<AdminReport> {
        let models = self.find_owned_models(owner, model);
        if models.is_empty() {
            return Err(SyncError::NoMatchingModel {
                owner: owner_name.to_string(),
                model: model.to_string(),
            });
        }
        let selector = ComponentSelector::parse(flags)?;
        let kinds = selector.kinds();

        let mut durability = Durability::Persisted;
        for bundle in &models {
            let outcome = self.trust_mut().apply(bundle, &kinds, action, owner_name);
            durability = durability.and(outcome);
        }

        let verb = match action {
            AuditAction::Added => "added to",
            AuditAction::Removed => "removed from",
        };
        let message = if selector.is_whole_model() {
            format!("Model '{model}' from player '{owner_name}' was {verb} white list")
        } else {
            kinds
                .iter()
                .map(|kind| {
                    format!(
                        "{} from model '{model}' from player '{owner_name}' was {verb} white list",
                        capitalized(kind.as_str())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        Ok(self.report(message, durability))
    }

    fn report(&self, mut message: String, durability: Durability) -> AdminReport {
        match &durability {
            Durability::Failed(reason) => {
                message.push_str(&format!("\nWarning: change is not yet durable: {reason}"));
            }
            Durability::Volatile => message.push_str("\nWarning: trust store has no backing file"),
            Durability::Persisted => {}
        }
        let outgoing = self.broadcast_trust_snapshots();
        info!(
            "Admin: {} (rebroadcasting to {} players)",
            message.lines().next().unwrap_or_default(),
            outgoing.len()
        );
        AdminReport {
            message,
            durability,
            outgoing,
        }
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
