//! Asset publication for registered bundles.
//!
//! Publishing exposes a bundle's three renderable components under virtual
//! paths derived from its id. Converting those bytes into engine assets is
//! the game's job; this module only fixes the naming and provides an
//! in-memory catalog.

use cpm_types::{Bundle, BundleId, ComponentKind};
use std::collections::HashMap;
use tracing::debug;

/// Namespace of every published asset path.
pub const ASSET_DOMAIN: &str = "customplayermodel";

/// Placeholder texture reference in authored shape files, quotes included.
pub const TEXTURE_PLACEHOLDER: &str = "\"custom-texture\"";

/// Receives bundles once they are registered.
pub trait AssetPublisher: Send {
    /// Makes the bundle's components available. Called once per bundle.
    fn publish(&mut self, bundle: &Bundle);
}

/// Virtual paths of a bundle's published components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub shape: String,
    pub texture: String,
    pub sound: String,
}

impl AssetPaths {
    pub fn for_bundle(id: &BundleId) -> Self {
        Self {
            shape: format!("{ASSET_DOMAIN}:shapes/{id}.json"),
            texture: format!("{ASSET_DOMAIN}:textures/{id}.png"),
            sound: format!("{ASSET_DOMAIN}:sounds/{id}.ogg"),
        }
    }

    pub fn get(&self, kind: ComponentKind) -> &str {
        match kind {
            ComponentKind::Shape => &self.shape,
            ComponentKind::Texture => &self.texture,
            ComponentKind::Sound => &self.sound,
        }
    }
}

/// Texture reference a shape uses once its bundle id is known.
pub fn texture_reference(id: &BundleId) -> String {
    format!("{ASSET_DOMAIN}:{id}")
}

/// Points the shape's placeholder texture references at the bundle's own
/// texture. Shapes that are not UTF-8 are returned unchanged.
pub fn rewrite_texture_reference(shape: Vec<u8>, id: &BundleId) -> Vec<u8> {
    match String::from_utf8(shape) {
        Ok(text) => text
            .replace(TEXTURE_PLACEHOLDER, &format!("\"{}\"", texture_reference(id)))
            .into_bytes(),
        Err(e) => e.into_bytes(),
    }
}

/// Publisher that keeps published components in memory, keyed by path.
#[derive(Debug, Default)]
pub struct InMemoryAssetCatalog {
    assets: HashMap<String, Vec<u8>>,
    published: Vec<BundleId>,
}

impl InMemoryAssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes published at `path`.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.assets.get(path).map(Vec::as_slice)
    }

    /// Ids in publication order.
    pub fn published(&self) -> &[BundleId] {
        &self.published
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetPublisher for InMemoryAssetCatalog {
    fn publish(&mut self, bundle: &Bundle) {
        let paths = AssetPaths::for_bundle(&bundle.id);
        for kind in ComponentKind::ALL {
            self.assets
                .insert(paths.get(kind).to_string(), bundle.component(kind).to_vec());
        }
        self.published.push(bundle.id.clone());
        debug!("Published assets for model '{}'", bundle.id);
    }
}
