// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic config persistence: write-temp-then-rename with corrupt-file
//! backup rotation.

use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load/save contract for component state files (the forwarder set).
///
/// Implementations must make `save_atomic` crash-safe: a partial write must
/// never corrupt a previously saved file.
pub trait PersistenceAdapter: Send + Sync {
    /// Read the current contents; `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, PersistError>;

    /// Replace the contents atomically.
    fn save_atomic(&self, contents: &str) -> Result<(), PersistError>;

    /// Move unparseable contents aside so the next `load` starts fresh.
    ///
    /// Called by owners when what `load` returned fails to parse; the bad
    /// state must be preserved for inspection, not deleted.
    fn quarantine(&self) -> Result<(), PersistError>;
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    // Remove the oldest if at capacity
    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    // Shift existing backups up by one
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// File-backed adapter: writes `<path>.<nanos>.tmp`, fsyncs, then renames.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for FilePersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_atomic(&self, contents: &str) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let tmp_path = self
            .path
            .with_file_name(format!("{}.{nanos}.tmp", file_name(&self.path)));

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            // Leave no temp litter behind on failure.
            let _ = fs::remove_file(&tmp_path);
            warn!(path = %self.path.display(), error = %e, "atomic save failed");
            return Err(e.into());
        }
        Ok(())
    }

    fn quarantine(&self) -> Result<(), PersistError> {
        if !self.path.exists() {
            return Ok(());
        }
        let bak_path = rotate_bak_path(&self.path);
        warn!(
            path = %self.path.display(),
            bak = %bak_path.display(),
            "corrupt state file, moving to .bak and starting fresh",
        );
        fs::rename(&self.path, &bak_path)?;
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string())
}

/// In-memory adapter for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn load(&self) -> Result<Option<String>, PersistError> {
        Ok(self.contents.lock().clone())
    }

    fn save_atomic(&self, contents: &str) -> Result<(), PersistError> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }

    fn quarantine(&self) -> Result<(), PersistError> {
        self.contents.lock().take();
        Ok(())
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
