//! Content-addressed layer store.
//!
//! Layout:
//! ```text
//! {root}/layers/{layer_id}/          — copied file tree
//! {root}/layers/{layer_id}/.layer.json — sidecar record
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Name of the sidecar file written alongside each layer's contents.
const SIDECAR: &str = ".layer.json";

/// A directory of files representing a filesystem delta, identified by an
/// opaque id. Immutable once written.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Opaque, unique layer id.
    pub id: String,
    /// Parent layer id, forming a chain. `None` for a base layer.
    pub parent: Option<String>,
    /// The recipe instruction string that produced this layer.
    pub instruction: String,
    /// RFC3339 creation timestamp.
    pub created: String,
    /// Total byte size of the layer's contents.
    pub size: u64,
}

/// Content-addressed store of filesystem layers.
///
/// Guarded by a single read-biased lock: many concurrent lookups and
/// extractions, rare writes. The lock serializes the read-modify-write
/// span of each operation, while individual file writes remain atomic via
/// write-then-rename underneath it.
#[derive(Debug)]
pub struct LayerStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl LayerStore {
    /// Opens (creating if absent) the layer store rooted at `root/layers`.
    pub fn open(root: &Path) -> Result<Self> {
        let layers = root.join("layers");
        fs::create_dir_all(&layers)?;
        Ok(Self {
            root: layers,
            lock: RwLock::new(()),
        })
    }

    /// Path to a layer's content directory.
    pub fn layer_dir(&self, layer_id: &str) -> PathBuf {
        self.root.join(layer_id)
    }

    fn sidecar_path(&self, layer_id: &str) -> PathBuf {
        self.layer_dir(layer_id).join(SIDECAR)
    }

    /// Creates a new layer. Copies `source_dir`'s contents recursively if
    /// provided, then writes the sidecar record. Returns the new layer id.
    ///
    /// Fails with [`Error::NotFound`] if `parent` is given but unknown, and
    /// with [`Error::Io`] on disk error.
    pub fn create(
        &self,
        parent: Option<&str>,
        instruction: &str,
        source_dir: Option<&Path>,
    ) -> Result<String> {
        if let Some(p) = parent
            && !self.sidecar_path(p).is_file()
        {
            return Err(Error::NotFound(format!("parent layer not found: {p}")));
        }

        let id = allocate_id(parent, instruction);
        let dir = self.layer_dir(&id);
        fs::create_dir_all(&dir)?;

        let mut size = 0u64;
        if let Some(src) = source_dir {
            size = copy_tree(src, &dir)?;
        }

        let layer = Layer {
            id: id.clone(),
            parent: parent.map(str::to_owned),
            instruction: instruction.to_owned(),
            created: now_rfc3339(),
            size,
        };
        let json = serde_json::to_vec_pretty(&layer)?;
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        atomic_write(&self.sidecar_path(&id), &json)?;

        Ok(id)
    }

    /// Reads a layer's sidecar record.
    pub fn get(&self, layer_id: &str) -> Result<Layer> {
        let _guard = self.lock.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let data = fs::read(self.sidecar_path(layer_id))
            .map_err(|_| Error::NotFound(format!("layer not found: {layer_id}")))?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Copies a layer's contents into `target_dir`, overlaying any existing
    /// files there. Used during rootfs assembly (bottom layer first).
    pub fn extract(&self, layer_id: &str, target_dir: &Path) -> Result<()> {
        let _guard = self.lock.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = self.layer_dir(layer_id);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("layer not found: {layer_id}")));
        }
        fs::create_dir_all(target_dir)?;
        copy_tree(&dir, target_dir)?;
        Ok(())
    }

    /// Deletes a layer's directory and sidecar unconditionally. The caller
    /// is responsible for reference checks; this intentionally does not
    /// track or enforce them.
    pub fn remove(&self, layer_id: &str) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = self.layer_dir(layer_id);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

/// Allocates a fresh, unique layer id seasoned by parent + instruction +
/// time, hex-encoded sha256. Not a pure content hash, but collision-
/// resistant and stable.
fn allocate_id(parent: Option<&str>, instruction: &str) -> String {
    generate_id(&format!("{}\0{instruction}", parent.unwrap_or("")))
}

/// Allocates a fresh, unique opaque id seasoned by `seed` and the current
/// time, hex-encoded sha256. Shared by the layer store and the catalog so
/// every id in the system comes from the same scheme.
pub fn generate_id(seed: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(nanos.to_be_bytes());
    format!("{:x}", hasher.finalize())
}

/// Copies every regular file under `src` into `dst`, preserving relative
/// structure, overwriting existing files. Returns total bytes copied.
fn copy_tree(src: &Path, dst: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        } else if entry.file_type().is_symlink() {
            if let Ok(link) = fs::read_link(entry.path()) {
                let _ = fs::remove_file(&target);
                #[cfg(unix)]
                std::os::unix::fs::symlink(&link, &target).ok();
            }
        }
    }
    Ok(total)
}

/// Writes data to a file atomically (write to `.tmp`, then rename).
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

/// Current time as an RFC3339 string without pulling in a datetime crate.
pub(crate) fn now_rfc3339() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    humantime_rfc3339(secs)
}

/// Minimal civil-calendar RFC3339 formatter (UTC, second precision), per
/// Howard Hinnant's `civil_from_days` algorithm.
fn humantime_rfc3339(epoch_secs: u64) -> String {
    let days = epoch_secs / 86400;
    let rem = epoch_secs % 86400;
    let (hour, minute, second) = (rem / 3600, (rem % 3600) / 60, rem % 60);

    let z = days as i64 + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02}T{hour:02}:{minute:02}:{second:02}Z")
}
