//! Content hashes and component kinds.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// The three hashed components of a bundle.
///
/// The config component is intentionally absent: it never takes part in
/// trust decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Shape,
    Texture,
    Sound,
}

impl ComponentKind {
    /// All kinds, in the order they are hashed and logged.
    pub const ALL: [ComponentKind; 3] = [Self::Shape, Self::Texture, Self::Sound];

    /// Lowercase name used in audit entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Texture => "texture",
            Self::Sound => "sound",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shape" => Ok(Self::Shape),
            "texture" => Ok(Self::Texture),
            "sound" => Ok(Self::Sound),
            other => Err(crate::Error::UnknownComponent(other.to_string())),
        }
    }
}

/// Lowercase hex SHA-256 digest of a component's raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes raw component bytes. Empty input is valid and yields the
    /// well-known digest of the empty string.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Parses a hex digest, normalising it to lowercase.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        let bytes = hex::decode(trimmed).map_err(|e| crate::Error::InvalidHash(format!("{s}: {e}")))?;
        if bytes.len() != 32 {
            return Err(crate::Error::InvalidHash(format!(
                "{s}: expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
