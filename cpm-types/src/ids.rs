//! Identifier types for bundles and players.
//!
//! Bundle ids are plain strings, but their shape is not arbitrary: the loader
//! derives them from a human-readable name plus an owner tag, and appends an
//! origin marker for packaged bundles so that a local folder and a package
//! with the same name never collide.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Suffix appended to ids of bundles that ship inside a mod package.
pub const PACKAGED_SUFFIX: &str = "-m";

/// Globally unique identifier of a bundle for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(String);

impl BundleId {
    /// Wraps an already-derived id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id for a bundle authored in a local folder.
    ///
    /// `wizard-hat` owned by tag `5253` becomes `wizard_hat-5253`.
    #[must_use]
    pub fn local(folder_name: &str, owner: &PlayerId) -> Self {
        let name = folder_name.replace('-', "_").to_lowercase();
        Self(format!("{name}-{}", owner.owner_tag()))
    }

    /// Id for a bundle shipped inside a mod package.
    ///
    /// `(mymod, wizard)` owned by tag `5253` becomes `mymod-wizard-5253-m`.
    #[must_use]
    pub fn packaged(domain: &str, model_name: &str, owner: &PlayerId) -> Self {
        let name = format!("{domain}-{model_name}").to_lowercase();
        Self(format!("{name}-{}{PACKAGED_SUFFIX}", owner.owner_tag()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the id carries the packaged-bundle origin marker.
    #[must_use]
    pub fn is_packaged(&self) -> bool {
        self.0.ends_with(PACKAGED_SUFFIX)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BundleId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for BundleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for BundleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a player (the game's player uid).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps a player uid.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the uid as the concatenated decimal values of its UTF-16
    /// code units. The result only contains ASCII digits, so it can be
    /// embedded in asset paths regardless of what characters the uid uses.
    #[must_use]
    pub fn owner_tag(&self) -> String {
        self.0.encode_utf16().map(|unit| unit.to_string()).collect()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PlayerId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for PlayerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
