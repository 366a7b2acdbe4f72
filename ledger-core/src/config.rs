//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned at startup, one snapshot file per tenant
    pub datastores_dir: PathBuf,

    /// Extension of snapshot files (matched case-insensitively)
    pub file_extension: String,

    /// How snapshots are written back
    pub write_mode: WriteMode,

    /// Check balance and total invariants of every document at load
    pub verify_on_load: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datastores_dir: PathBuf::from("./datastores"),
            file_extension: "json".to_string(),
            write_mode: WriteMode::default(),
            verify_on_load: true,
        }
    }
}

/// Snapshot write strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Truncate and rewrite the file
    InPlace,
    /// Write a sibling temp file, fsync, rename over the target
    #[default]
    AtomicRename,
}

impl std::str::FromStr for WriteMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in_place" | "inplace" => Ok(WriteMode::InPlace),
            "atomic_rename" | "atomic" => Ok(WriteMode::AtomicRename),
            other => Err(crate::Error::Config(format!("unknown write mode: {}", other))),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let config = Config::default().with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SPLITLEDGER_DATASTORES`, `SPLITLEDGER_WRITE_MODE` and
    /// `SPLITLEDGER_VERIFY_ON_LOAD` as resolved by `lookup`
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<Self> {
        if let Some(dir) = lookup("SPLITLEDGER_DATASTORES") {
            self.datastores_dir = PathBuf::from(dir);
        }

        if let Some(mode) = lookup("SPLITLEDGER_WRITE_MODE") {
            self.write_mode = mode.parse()?;
        }

        if let Some(verify) = lookup("SPLITLEDGER_VERIFY_ON_LOAD") {
            self.verify_on_load = verify
                .trim()
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| crate::Error::Config(format!("invalid bool: {}", verify)))?;
        }

        Ok(self)
    }

    /// Reject settings the registry cannot start with
    pub fn validate(&self) -> crate::Result<()> {
        if self.datastores_dir.as_os_str().is_empty() {
            return Err(crate::Error::Config(
                "No datastores location provided".to_string(),
            ));
        }
        if self.file_extension.is_empty() {
            return Err(crate::Error::Config(
                "Snapshot file extension cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
