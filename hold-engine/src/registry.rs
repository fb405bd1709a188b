//! Container registry: a directory of metadata files, one per container
//! id, serialized through a single process-wide lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::container::Container;
use crate::error::{Error, Result};

/// Persistent catalog of container records.
///
/// All operations serialize through a single registry-wide lock (spec
/// §5: "infrequent access, simplicity dominates throughput").
#[derive(Debug)]
pub struct Registry {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl Registry {
    /// Opens (creating if absent) the registry rooted at
    /// `root/container-metadata`.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("container-metadata");
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Creates a new record. Fails if one already exists for `record.id`.
    pub fn create_record(&self, record: &Container) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(&record.id);
        if path.exists() {
            return Err(Error::Conflict(format!(
                "container record already exists: {}",
                record.id
            )));
        }
        write_atomic(&path, record)
    }

    /// Loads a record by id.
    pub fn load(&self, id: &str) -> Result<Container> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let data = fs::read(self.path_for(id))
            .map_err(|_| Error::NotFound(format!("container not found: {id}")))?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Resolves `id_or_name` against id, id-prefix, and name matches.
    pub fn resolve(&self, id_or_name: &str) -> Result<Container> {
        if let Ok(record) = self.load(id_or_name) {
            return Ok(record);
        }
        self.list()?
            .into_iter()
            .find(|c| c.id.starts_with(id_or_name) || c.name == id_or_name)
            .ok_or_else(|| Error::NotFound(format!("container not found: {id_or_name}")))
    }

    /// Enumerates all records.
    pub fn list(&self) -> Result<Vec<Container>> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(data) = fs::read(entry.path())
                && let Ok(record) = serde_json::from_slice(&data)
            {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Atomically updates an existing record (write to temp, then rename).
    pub fn update(&self, record: &Container) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        write_atomic(&self.path_for(&record.id), record)
    }

    /// Deletes a record's metadata file.
    pub fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn write_atomic(path: &Path, record: &Container) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
