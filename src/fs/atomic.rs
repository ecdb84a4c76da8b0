//! Atomic file replacement.
//!
//! Content is written to a temporary file next to the target, synced, and
//! renamed over the target. Readers therefore see either the old file or the
//! complete new one. Every call uses its own temporary name
//! (`.{filename}.{pid}.{n}.tmp`), so concurrent writers to the same target
//! never share a temp file; the last rename wins.
//!
//! Source and destination are always in the same directory, which keeps the
//! rename on one filesystem. A crash can leave a stray `*.tmp` file behind.

use crate::error::{RelayError, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Atomically write bytes to `path`, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            RelayError::CacheError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = unique_temp_path(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        RelayError::CacheError(format!("failed to replace '{}': {}", path.display(), e))
    })?;

    #[cfg(unix)]
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

fn unique_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            RelayError::CacheError(format!("invalid file path '{}'", target.display()))
        })?;
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(".{}.{}.{}.tmp", filename, std::process::id(), n)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        RelayError::CacheError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let written = file.write_all(content).and_then(|_| file.sync_all());
    if let Err(e) = written {
        let _ = fs::remove_file(path);
        return Err(RelayError::CacheError(format!(
            "failed to write temporary file '{}': {}",
            path.display(),
            e
        )));
    }
    Ok(())
}
