//! Image catalog: a mapping from `(name, tag)` to an [`Image`] record.
//!
//! Layout: `{root}/metadata/{name}:{tag}.json`, one file per entry, written
//! via atomic rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::image::{DEFAULT_TAG, Image, RuntimeConfig};
use crate::layer::{generate_id, now_rfc3339};

/// JSON-file-backed catalog of named, tagged image records.
///
/// Guarded by a single read-biased lock: many concurrent lookups, rare
/// writes. The lock serializes the read-modify-write span of each
/// operation, while individual file writes remain atomic via
/// write-then-rename underneath it.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    lock: RwLock<()>,
}

impl Catalog {
    /// Opens (creating if absent) the catalog rooted at `root/metadata`.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("metadata");
        fs::create_dir_all(&dir)?;
        Ok(Self {
            root: dir,
            lock: RwLock::new(()),
        })
    }

    fn path_for(&self, name: &str, tag: &str) -> PathBuf {
        self.root.join(format!("{name}:{tag}.json"))
    }

    /// Creates (or overwrites) an image record under `(name, tag)`.
    pub fn create(
        &self,
        name: &str,
        tag: Option<&str>,
        layers: Vec<String>,
        config: RuntimeConfig,
    ) -> Result<Image> {
        let tag = tag.unwrap_or(DEFAULT_TAG);
        let image = Image {
            id: generate_id(&format!("{name}:{tag}")),
            name: name.to_owned(),
            tag: tag.to_owned(),
            layers,
            architecture: "amd64".to_owned(),
            os: "linux".to_owned(),
            author: None,
            config,
            created: now_rfc3339(),
            size: 0,
        };
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.write(&image)?;
        Ok(image)
    }

    fn write(&self, image: &Image) -> Result<()> {
        let path = self.path_for(&image.name, &image.tag);
        let json = serde_json::to_vec_pretty(image)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Looks up a record by `(name, tag)`. Tag defaults to `latest`.
    pub fn lookup(&self, name: &str, tag: Option<&str>) -> Result<Image> {
        let _guard = self.lock.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let tag = tag.unwrap_or(DEFAULT_TAG);
        let path = self.path_for(name, tag);
        let data = fs::read(&path)
            .map_err(|_| Error::NotFound(format!("image not found: {name}:{tag}")))?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Looks up a record by its opaque id, or a full `name:tag` reference.
    pub fn lookup_any(&self, reference: &str) -> Result<Image> {
        let (name, tag) = split_reference(reference);
        if let Ok(img) = self.lookup(name, tag) {
            return Ok(img);
        }
        self.list()?
            .into_iter()
            .find(|img| img.id == reference || img.id.starts_with(reference))
            .ok_or_else(|| Error::NotFound(format!("image not found: {reference}")))
    }

    /// Enumerates all image records.
    pub fn list(&self) -> Result<Vec<Image>> {
        let _guard = self.lock.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut images = Vec::new();
        if !self.root.is_dir() {
            return Ok(images);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(entry.path())?;
            match serde_json::from_slice::<Image>(&data) {
                Ok(img) => images.push(img),
                Err(_) => continue, // tolerate unknown/malformed sidecars from other tools
            }
        }
        Ok(images)
    }

    /// Deletes a record by name (or `name:tag`) or id. Does not garbage
    /// collect the underlying layers.
    pub fn remove(&self, name_or_id: &str) -> Result<()> {
        let image = self.lookup_any(name_or_id)?;
        let path = self.path_for(&image.name, &image.tag);
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Clones the record identified by `source` under a new `(name, tag)`.
    pub fn tag(&self, source: &str, name: &str, tag: Option<&str>) -> Result<Image> {
        let mut image = self.lookup_any(source)?;
        image.name = name.to_owned();
        image.tag = tag.unwrap_or(DEFAULT_TAG).to_owned();
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.write(&image)?;
        Ok(image)
    }
}

/// Splits `"name:tag"` into `(name, Some(tag))`, or `(s, None)` if untagged.
fn split_reference(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once(':') {
        Some((name, tag)) if !name.is_empty() => (name, Some(tag)),
        _ => (s, None),
    }
}
