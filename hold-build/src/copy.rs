//! `COPY`/`ADD` execution: a straightforward recursive copy from the build
//! context into staging. The original's non-terminating `copy_files` is not
//! reproduced; this always completes because `walkdir` only ever descends
//! into real subdirectories of `src`.

use std::fs;
use std::path::Path;

use hold_recipe::CopySpec;

use crate::error::{Error, Result};

/// Copies every `src` entry (relative to `context_dir`) into `dest`
/// (relative to `staging`).
pub fn copy_into_staging(context_dir: &Path, staging: &Path, spec: &CopySpec) -> Result<()> {
    let dest_root = staging.join(&spec.dest);

    for src in &spec.src {
        let source = context_dir.join(src);
        if !source.exists() {
            return Err(Error::NotFound(format!(
                "build context path not found: {src}"
            )));
        }

        if source.is_dir() {
            fs::create_dir_all(&dest_root)?;
            copy_tree(&source, &dest_root)?;
        } else {
            let target = if spec.dest.ends_with('/') || dest_root.is_dir() {
                dest_root.join(source.file_name().unwrap_or_default())
            } else {
                dest_root.clone()
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&source, &target)?;
        }
    }
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
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
        }
    }
    Ok(())
}
