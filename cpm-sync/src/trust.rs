//! Content-hash and player allow-lists with a flat audit trail.
//!
//! Exactly one `TrustStore` exists, owned by the server. Every mutation is
//! persisted synchronously as a JSON document before it returns. A failed
//! write keeps the in-memory change and reports it as not durable; nothing
//! is rolled back.

use crate::config::GateSettings;
use crate::error::{SyncError, SyncResult};
use crate::protocol::TrustSnapshotMessage;
use crate::registry::BundleRegistry;
use cpm_types::{AuditTimestamp, Bundle, ComponentKind, ContentHash, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Separator between the fields of a rendered audit entry.
pub const AUDIT_SEPARATOR: &str = "    ";

/// `hash ∈ allowed OR NOT(master_gate OR kind_gate)`.
pub fn permitted(
    hash: &ContentHash,
    allowed: &BTreeSet<ContentHash>,
    master_gate: bool,
    kind_gate: bool,
) -> bool {
    allowed.contains(hash) || !(master_gate || kind_gate)
}

/// Whether an allow-list change added or removed a hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Added,
    Removed,
}

/// One line of the audit trail.
///
/// Entries are kept in their rendered form because the persisted log is
/// ordered by comparing whole lines. Lines read back from disk that do not
/// split into four fields are preserved untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditEntry(String);

/// Borrowed view of a well-formed audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditFields<'a> {
    pub timestamp: &'a str,
    pub kind: &'a str,
    pub actor: &'a str,
    pub hash: &'a str,
}

impl AuditEntry {
    /// Renders a new entry.
    pub fn record(
        timestamp: AuditTimestamp,
        kind: ComponentKind,
        action: AuditAction,
        actor: &str,
        hash: &ContentHash,
    ) -> Self {
        let kind = match action {
            AuditAction::Added => kind.as_str().to_string(),
            AuditAction::Removed => format!("{kind}-removed"),
        };
        let timestamp = timestamp.to_string();
        Self([timestamp.as_str(), kind.as_str(), actor, hash.as_str()].join(AUDIT_SEPARATOR))
    }

    /// Wraps a line read from the persisted log.
    pub fn from_line(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// The rendered line.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the line into its four fields, if it has them.
    pub fn fields(&self) -> Option<AuditFields<'_>> {
        let parts: Vec<&str> = self.0.split(AUDIT_SEPARATOR).map(str::trim).collect();
        let parts = if parts.len() == 4 {
            parts
        } else {
            self.0.split_whitespace().collect()
        };
        match parts.as_slice() {
            &[timestamp, kind, actor, hash] => Some(AuditFields {
                timestamp,
                kind,
                actor,
                hash,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a mutation reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Durability {
    /// Written to the trust file.
    Persisted,
    /// The store has no backing file.
    Volatile,
    /// The write failed; the change only exists in memory.
    Failed(String),
}

impl Durability {
    /// True only for [`Durability::Persisted`].
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// Combines the outcomes of two writes, keeping the worse one.
    pub fn and(self, other: Durability) -> Durability {
        match (self, other) {
            (failed @ Self::Failed(_), _) | (_, failed @ Self::Failed(_)) => failed,
            (Self::Volatile, _) | (_, Self::Volatile) => Self::Volatile,
            _ => Self::Persisted,
        }
    }
}

/// On-disk layout of the trust file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct TrustFile {
    players: BTreeSet<PlayerId>,
    shapes: BTreeSet<ContentHash>,
    textures: BTreeSet<ContentHash>,
    sounds: BTreeSet<ContentHash>,
    hash_log: Vec<String>,
}

/// Player and content allow-lists.
#[derive(Debug, Default)]
pub struct TrustStore {
    players: BTreeSet<PlayerId>,
    shapes: BTreeSet<ContentHash>,
    textures: BTreeSet<ContentHash>,
    sounds: BTreeSet<ContentHash>,
    audit_log: Vec<AuditEntry>,
    path: Option<PathBuf>,
    write_blocked: Option<String>,
}

impl TrustStore {
    /// Creates an empty store without a backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store persisted at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or malformed file
    /// also yields an empty store, with a warning, after the bad file is
    /// moved aside to `<path>.corrupt`. If it cannot be moved, the store
    /// refuses to write over it and every mutation reports
    /// [`Durability::Failed`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut store = if !path.exists() {
            info!("No trust file at {:?}, starting with empty allow-lists", path);
            Self::default()
        } else {
            match std::fs::read_to_string(&path)
                .map_err(SyncError::from)
                .and_then(|json| Self::from_json(&json))
            {
                Ok(store) => {
                    info!(
                        "Loaded trust file {:?}: {} players, {} audit entries",
                        path,
                        store.players.len(),
                        store.audit_log.len()
                    );
                    store
                }
                Err(e) => {
                    warn!("Failed to load trust file {:?}: {}. Starting empty.", path, e);
                    let mut store = Self::default();
                    store.write_blocked = quarantine(&path).err();
                    store
                }
            }
        };
        store.path = Some(path);
        store
    }

    /// Parses a trust document.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let file: TrustFile = serde_json::from_str(json)?;
        Ok(Self {
            players: file.players,
            shapes: file.shapes,
            textures: file.textures,
            sounds: file.sounds,
            audit_log: file.hash_log.into_iter().map(AuditEntry::from_line).collect(),
            path: None,
            write_blocked: None,
        })
    }

    /// Serializes the store, with the audit log in its persisted order.
    pub fn to_json(&self) -> SyncResult<String> {
        let mut hash_log: Vec<String> =
            self.audit_log.iter().map(|e| e.as_str().to_string()).collect();
        hash_log.sort_unstable_by(|a, b| b.cmp(a));
        let file = TrustFile {
            players: self.players.clone(),
            shapes: self.shapes.clone(),
            textures: self.textures.clone(),
            sounds: self.sounds.clone(),
            hash_log,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ── Decisions ────────────────────────────────────────────────

    /// Whether the player is on the player allow-list.
    pub fn is_player_trusted(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    /// Allowed hashes for one component kind.
    pub fn hashes(&self, kind: ComponentKind) -> &BTreeSet<ContentHash> {
        match kind {
            ComponentKind::Shape => &self.shapes,
            ComponentKind::Texture => &self.textures,
            ComponentKind::Sound => &self.sounds,
        }
    }

    /// Whether all three components of the bundle pass their gate.
    pub fn is_content_trusted(&self, bundle: &Bundle, gates: &GateSettings) -> bool {
        ComponentKind::ALL.iter().all(|&kind| {
            permitted(
                &bundle.hash(kind),
                self.hashes(kind),
                gates.models_white_list,
                gates.kind_gate(kind),
            )
        })
    }

    /// Computes the trust view sent to `player`.
    pub fn snapshot_for(
        &self,
        player: &PlayerId,
        registry: &BundleRegistry,
        gates: &GateSettings,
    ) -> TrustSnapshotMessage {
        TrustSnapshotMessage {
            is_player_allowed: self.is_player_trusted(player),
            trusted_ids: registry
                .iter()
                .filter(|bundle| self.is_content_trusted(bundle, gates))
                .map(|bundle| bundle.id.clone())
                .collect(),
            player_gate_enabled: gates.players_white_list,
            content_gate_enabled: gates.models_white_list,
        }
    }

    /// Players on the allow-list.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter()
    }

    /// The audit trail, in insertion order since the last persist.
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Adds a player to the allow-list.
    pub fn add_player(&mut self, player: &PlayerId, display_name: &str) -> Durability {
        self.players.insert(player.clone());
        info!("Added player '{}' to white list", display_name);
        self.persist()
    }

    /// Removes a player from the allow-list.
    pub fn remove_player(&mut self, player: &PlayerId, display_name: &str) -> Durability {
        self.players.remove(player);
        info!("Removed player '{}' from white list", display_name);
        self.persist()
    }

    /// Allows all three component hashes of a bundle.
    pub fn add_model(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &ComponentKind::ALL, AuditAction::Added, actor)
    }

    /// Allows the shape hash of a bundle.
    pub fn add_model_shape(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Shape], AuditAction::Added, actor)
    }

    /// Allows the texture hash of a bundle.
    pub fn add_model_texture(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Texture], AuditAction::Added, actor)
    }

    /// Allows the sound hash of a bundle.
    pub fn add_model_sound(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Sound], AuditAction::Added, actor)
    }

    /// Revokes all three component hashes of a bundle.
    pub fn remove_model(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &ComponentKind::ALL, AuditAction::Removed, actor)
    }

    pub fn remove_model_shape(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Shape], AuditAction::Removed, actor)
    }

    pub fn remove_model_texture(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Texture], AuditAction::Removed, actor)
    }

    pub fn remove_model_sound(&mut self, bundle: &Bundle, actor: &str) -> Durability {
        self.apply(bundle, &[ComponentKind::Sound], AuditAction::Removed, actor)
    }

    /// Applies an allow-list change to a subset of a bundle's components.
    ///
    /// Set semantics apply to the allow-lists; the audit log always gets one
    /// new entry per component, even when the set did not change.
    pub fn apply(
        &mut self,
        bundle: &Bundle,
        kinds: &[ComponentKind],
        action: AuditAction,
        actor: &str,
    ) -> Durability {
        let timestamp = AuditTimestamp::now();
        for &kind in kinds {
            let hash = bundle.hash(kind);
            let set = self.hashes_mut(kind);
            match action {
                AuditAction::Added => {
                    set.insert(hash.clone());
                }
                AuditAction::Removed => {
                    set.remove(&hash);
                }
            }
            self.audit_log
                .push(AuditEntry::record(timestamp, kind, action, actor, &hash));
        }

        let verb = match action {
            AuditAction::Added => "Added",
            AuditAction::Removed => "Removed",
        };
        let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        info!(
            "{} {} of model '{}' ({}) on white list, by '{}'",
            verb,
            kinds.join(", "),
            bundle.model_name,
            bundle.id,
            actor
        );

        self.persist()
    }

    /// Sorts the audit log and writes the whole store to its backing file.
    pub fn persist(&mut self) -> Durability {
        self.audit_log.sort_unstable_by(|a, b| b.cmp(a));

        let Some(path) = self.path.clone() else {
            return Durability::Volatile;
        };
        if let Some(reason) = &self.write_blocked {
            warn!(
                "Not writing trust file {:?}: {}. Change is not yet durable.",
                path, reason
            );
            return Durability::Failed(reason.clone());
        }

        match self.write_to(&path) {
            Ok(()) => Durability::Persisted,
            Err(e) => {
                warn!(
                    "Failed to persist trust file {:?}: {}. Change is not yet durable.",
                    path, e
                );
                Durability::Failed(e.to_string())
            }
        }
    }

    fn write_to(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| SyncError::Storage(format!("failed to write {}: {e}", path.display())))
    }

    fn hashes_mut(&mut self, kind: ComponentKind) -> &mut BTreeSet<ContentHash> {
        match kind {
            ComponentKind::Shape => &mut self.shapes,
            ComponentKind::Texture => &mut self.textures,
            ComponentKind::Sound => &mut self.sounds,
        }
    }
}

/// Path a corrupt trust file is moved to.
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn quarantine(path: &Path) -> Result<(), String> {
    let target = corrupt_path(path);
    match std::fs::rename(path, &target) {
        Ok(()) => {
            warn!("Moved unreadable trust file {:?} to {:?}", path, target);
            Ok(())
        }
        Err(e) => {
            error!("Failed to move unreadable trust file {:?} aside: {}", path, e);
            Err(format!("unreadable trust file {} was left in place: {e}", path.display()))
        }
    }
}
