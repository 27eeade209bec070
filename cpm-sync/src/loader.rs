//! Bundle discovery on the authoring client.
//!
//! Two sources exist:
//! - local folders, one per model, under a player-owned root directory
//! - package listings, `<root>/<domain>/<model>/<files>`, shipped by mods
//!
//! Both derive ids from the owning player so that bundles from different
//! players, and local versus packaged bundles of the same name, never
//! collide. Problems are logged and never abort the whole load.

use crate::assets::rewrite_texture_reference;
use cpm_types::{Bundle, BundleId, PlayerId};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Default name of the local bundle root, inside the mod config directory.
pub const LOCAL_MODELS_FOLDER: &str = "custom-player-models";

/// File names inside a local bundle folder.
pub const CONFIG_FILE: &str = "config.json";
pub const SHAPE_FILE: &str = "custom-shape.json";
pub const TEXTURE_FILE: &str = "custom-texture.png";
pub const SOUND_FILE: &str = "custom-voice.ogg";

/// Number of files a packaged bundle must consist of.
pub const PACKAGE_FILE_COUNT: usize = 4;

/// Supplies bundles to a registry.
pub trait BundleSource {
    /// Discovers every bundle this source can provide.
    fn load(&self) -> Vec<Bundle>;
}

/// Loads one bundle per sub-directory of a local root.
///
/// Missing component files become empty byte arrays.
#[derive(Debug, Clone)]
pub struct FolderLoader {
    root: PathBuf,
    owner: PlayerId,
}

impl FolderLoader {
    pub fn new(root: impl Into<PathBuf>, owner: PlayerId) -> Self {
        Self {
            root: root.into(),
            owner,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_folder(&self, folder: &Path, folder_name: &str) -> Bundle {
        let id = BundleId::local(folder_name, &self.owner);
        let shape = read_file_if_exists(&folder.join(SHAPE_FILE));
        Bundle::new(id.clone(), folder_name.replace('-', "_"))
            .with_config(read_file_if_exists(&folder.join(CONFIG_FILE)))
            .with_shape(rewrite_texture_reference(shape, &id))
            .with_texture(read_file_if_exists(&folder.join(TEXTURE_FILE)))
            .with_sound(read_file_if_exists(&folder.join(SOUND_FILE)))
    }
}

impl BundleSource for FolderLoader {
    fn load(&self) -> Vec<Bundle> {
        if !self.root.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.root) {
                error!(
                    "Unable to create directory for custom models {:?}: {}",
                    self.root, e
                );
                return Vec::new();
            }
            info!("Created directory for custom models at {:?}", self.root);
        }

        let folders = match sorted_subdirectories(&self.root) {
            Ok(folders) => folders,
            Err(e) => {
                error!("Unable to list custom models in {:?}: {}", self.root, e);
                return Vec::new();
            }
        };

        let bundles: Vec<Bundle> = folders
            .iter()
            .map(|(name, path)| self.load_folder(path, name))
            .collect();
        debug!("Loaded {} local models from {:?}", bundles.len(), self.root);
        bundles
    }
}

/// Loads packaged bundles from `<root>/<domain>/<model>/`.
///
/// A model directory must hold exactly four files: `config.json`, one other
/// `.json` shape, one `.png` and one `.ogg`. Anything else skips that model.
#[derive(Debug, Clone)]
pub struct PackageLoader {
    root: PathBuf,
    owner: PlayerId,
}

impl PackageLoader {
    pub fn new(root: impl Into<PathBuf>, owner: PlayerId) -> Self {
        Self {
            root: root.into(),
            owner,
        }
    }

    fn load_model(&self, domain: &str, model: &str, dir: &Path) -> Result<Bundle, String> {
        let files = sorted_files(dir).map_err(|e| format!("cannot list files: {e}"))?;
        if files.len() != PACKAGE_FILE_COUNT {
            return Err(format!(
                "does not have {PACKAGE_FILE_COUNT} required files, or contains extra files"
            ));
        }

        let config = find_file(&files, "config", |stem, ext| ext == "json" && stem == "config")?;
        let shape = find_file(&files, "shape", |stem, ext| ext == "json" && stem != "config")?;
        let texture = find_file(&files, "texture", |_, ext| ext == "png")?;
        let sound = find_file(&files, "sound", |_, ext| ext == "ogg")?;

        let read = |path: &PathBuf| {
            std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
        };

        let id = BundleId::packaged(domain, model, &self.owner);
        let model_name = format!("{domain}-{model}").replace('-', "_");
        Ok(Bundle::new(id.clone(), model_name)
            .with_config(read(config)?)
            .with_shape(rewrite_texture_reference(read(shape)?, &id))
            .with_texture(read(texture)?)
            .with_sound(read(sound)?))
    }
}

impl BundleSource for PackageLoader {
    fn load(&self) -> Vec<Bundle> {
        if !self.root.exists() {
            debug!("No packaged models at {:?}", self.root);
            return Vec::new();
        }

        let mut models = BTreeMap::new();
        match sorted_subdirectories(&self.root) {
            Ok(domains) => {
                for (domain, domain_dir) in domains {
                    match sorted_subdirectories(&domain_dir) {
                        Ok(entries) => {
                            for (model, dir) in entries {
                                models.insert((domain.clone(), model), dir);
                            }
                        }
                        Err(e) => warn!("Unable to list models of {}: {}", domain, e),
                    }
                }
            }
            Err(e) => {
                error!("Unable to list packaged models in {:?}: {}", self.root, e);
                return Vec::new();
            }
        }

        let mut bundles = Vec::with_capacity(models.len());
        for ((domain, model), dir) in models {
            match self.load_model(&domain, &model, &dir) {
                Ok(bundle) => bundles.push(bundle),
                Err(reason) => error!("Model {}:{} {}", domain, model, reason),
            }
        }
        debug!("Loaded {} packaged models from {:?}", bundles.len(), self.root);
        bundles
    }
}

fn read_file_if_exists(path: &Path) -> Vec<u8> {
    if !path.is_file() {
        return Vec::new();
    }
    std::fs::read(path).unwrap_or_else(|e| {
        warn!("Failed to read {:?}: {}", path, e);
        Vec::new()
    })
}

fn find_file<'a>(
    files: &'a [PathBuf],
    what: &str,
    pred: impl Fn(&str, &str) -> bool,
) -> Result<&'a PathBuf, String> {
    files
        .iter()
        .find(|path| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
            pred(stem, ext)
        })
        .ok_or_else(|| format!("does not contain {what} file"))
}

fn sorted_subdirectories(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn sorted_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
