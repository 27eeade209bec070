//! Hub configuration and gate settings.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file, a missing field or an unreadable file all resolve to a
//! usable configuration instead of an error.

use crate::error::{SyncError, SyncResult};
use cpm_types::ComponentKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default trust file name, relative to the server's config directory.
pub const DEFAULT_TRUST_FILE: &str = "custom-player-models-white-list.json";

/// Default model code players are reverted to.
pub const DEFAULT_MODEL_CODE: &str = "seraph";

/// Allow-list gates read by the trust and enforcement logic.
///
/// `models_white_list` is the master content gate. The per-kind flags only
/// matter while the master gate is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GateSettings {
    pub players_white_list: bool,
    pub models_white_list: bool,
    pub shapes_white_list: bool,
    pub textures_white_list: bool,
    pub sounds_white_list: bool,
}

impl GateSettings {
    /// Every gate off. Anything goes.
    pub const fn open() -> Self {
        Self {
            players_white_list: false,
            models_white_list: false,
            shapes_white_list: false,
            textures_white_list: false,
            sounds_white_list: false,
        }
    }

    /// The per-kind sub-gate for a component.
    pub const fn kind_gate(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Shape => self.shapes_white_list,
            ComponentKind::Texture => self.textures_white_list,
            ComponentKind::Sound => self.sounds_white_list,
        }
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            players_white_list: true,
            models_white_list: true,
            shapes_white_list: true,
            textures_white_list: true,
            sounds_white_list: true,
        }
    }
}

/// Server-side configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Allow-list gates.
    pub gates: GateSettings,
    /// Where the trust store is persisted.
    pub trust_file: PathBuf,
    /// Model code used by corrective reverts.
    pub default_model: String,
    /// Processing cycle length in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            gates: GateSettings::default(),
            trust_file: PathBuf::from(DEFAULT_TRUST_FILE),
            default_model: DEFAULT_MODEL_CODE.to_string(),
            tick_interval_ms: 50,
        }
    }
}

impl HubConfig {
    /// Parses a TOML document.
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        toml::from_str(contents).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Loads the config from `path`, falling back to defaults when the file
    /// is missing or cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No hub config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    info!("Loaded hub config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse hub config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read hub config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Processing cycle length.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
