//! The bundle record replicated between server and clients.

use crate::{BundleId, ComponentKind, ContentHash};
use serde::{Deserialize, Serialize};

/// A player-authored avatar customization package.
///
/// Bundles are immutable once registered. Missing source files are carried
/// as empty byte vectors, which is a valid value and not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bundle {
    pub id: BundleId,
    pub model_name: String,
    #[serde(with = "base64_bytes", default)]
    pub config: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub shape: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub texture: Vec<u8>,
    #[serde(with = "base64_bytes", default)]
    pub sound: Vec<u8>,
}

impl Bundle {
    /// Creates a bundle with all components empty.
    pub fn new(id: BundleId, model_name: impl Into<String>) -> Self {
        Self {
            id,
            model_name: model_name.into(),
            config: Vec::new(),
            shape: Vec::new(),
            texture: Vec::new(),
            sound: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: impl Into<Vec<u8>>) -> Self {
        self.config = config.into();
        self
    }

    pub fn with_shape(mut self, shape: impl Into<Vec<u8>>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn with_texture(mut self, texture: impl Into<Vec<u8>>) -> Self {
        self.texture = texture.into();
        self
    }

    pub fn with_sound(mut self, sound: impl Into<Vec<u8>>) -> Self {
        self.sound = sound.into();
        self
    }

    /// Raw bytes of one hashed component.
    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> &[u8] {
        match kind {
            ComponentKind::Shape => &self.shape,
            ComponentKind::Texture => &self.texture,
            ComponentKind::Sound => &self.sound,
        }
    }

    /// Content hash of one component.
    #[must_use]
    pub fn hash(&self, kind: ComponentKind) -> ContentHash {
        ContentHash::of(self.component(kind))
    }

    /// Display name from the config document, `Name` first, then
    /// `DisplayedName`. `None` when neither is a string or the config is not
    /// a JSON object.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let config: serde_json::Value = serde_json::from_slice(&self.config).ok()?;
        ["Name", "DisplayedName"]
            .iter()
            .find_map(|key| config.get(key)?.as_str().map(str::to_string))
    }

    /// Total payload size in bytes, config included.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.config.len() + self.shape.len() + self.texture.len() + self.sound.len()
    }
}

/// Serde adapter encoding byte vectors as standard base64 strings.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
