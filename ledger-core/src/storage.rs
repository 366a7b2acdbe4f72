//! Backing stores for ledger snapshots
//!
//! Every mutation rewrites the whole document. Two stores are provided:
//!
//! - [`JsonFileStore`] - one JSON file per tenant
//! - [`MemoryStore`] - keeps the last saved document in memory (tests, tooling)

use crate::{
    config::WriteMode,
    error::{Error, Result},
    snapshot::{self, LedgerState},
};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Where a ledger's snapshot lives
pub trait SnapshotStore: Send + Sync {
    /// Read and decode the stored snapshot
    fn load(&self) -> Result<LedgerState>;

    /// Replace the stored snapshot with `state`
    fn save(&self, state: &LedgerState) -> Result<()>;

    /// Human readable location, for logs
    fn location(&self) -> String;
}

/// Snapshot stored as one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    write_mode: WriteMode,
}

impl JsonFileStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>, write_mode: WriteMode) -> Self {
        Self {
            path: path.into(),
            write_mode,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_atomic(&self, bytes: &[u8]) -> Result<()> {
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<LedgerState> {
        let bytes = fs::read(&self.path).map_err(|e| {
            Error::Persistence(format!("failed reading {}: {}", self.path.display(), e))
        })?;
        snapshot::deserialize(&bytes)
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        let bytes = snapshot::serialize(state)?;

        let written = match self.write_mode {
            WriteMode::InPlace => fs::write(&self.path, &bytes).map_err(Error::from),
            WriteMode::AtomicRename => self.write_atomic(&bytes),
        };

        written.map_err(|e| {
            Error::Persistence(format!("failed saving {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            mode = ?self.write_mode,
            "Snapshot saved"
        );

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store; can be switched to fail every save
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<Vec<u8>>>,
    fail_saves: AtomicBool,
    saves: AtomicU64,
}

impl MemoryStore {
    /// Store that already holds `state`
    pub fn with_state(state: &LedgerState) -> Result<Self> {
        let store = Self::default();
        *store.saved.lock() = Some(snapshot::serialize(state)?);
        Ok(store)
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last successfully saved document, decoded
    pub fn last_saved(&self) -> Option<LedgerState> {
        self.saved
            .lock()
            .as_deref()
            .and_then(|bytes| snapshot::deserialize(bytes).ok())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<LedgerState> {
        match self.saved.lock().as_deref() {
            Some(bytes) => snapshot::deserialize(bytes),
            None => Err(Error::Persistence("memory store is empty".to_string())),
        }
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence("memory store refused save".to_string()));
        }
        let bytes = snapshot::serialize(state)?;
        *self.saved.lock() = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
