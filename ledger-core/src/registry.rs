//! Fixed set of tenant ledgers discovered at startup

use crate::{
    error::{Error, Result},
    ledger::Ledger,
    metrics::Metrics,
    storage::JsonFileStore,
    Config,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Tenant identifier → ledger
///
/// Built once and never modified, so lookups need no locking.
#[derive(Debug, Default)]
pub struct Registry {
    ledgers: HashMap<String, Arc<Ledger>>,
}

impl Registry {
    /// Load every snapshot file in `config.datastores_dir`
    ///
    /// Any unreadable document, failed verification or duplicate identifier
    /// aborts the load.
    pub fn load(config: &Config, metrics: Option<Metrics>) -> Result<Self> {
        config.validate()?;

        let dir = &config.datastores_dir;
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::Config(format!("cannot read datastores at {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if has_extension(&path, &config.file_extension) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut registry = Registry::default();
        for path in paths {
            let store = Arc::new(JsonFileStore::new(&path, config.write_mode));
            let mut ledger = Ledger::open(store, config.verify_on_load)?;
            if let Some(metrics) = &metrics {
                ledger = ledger.with_metrics(metrics.clone());
            }

            tracing::info!(
                ledger = %ledger.identifier(),
                location = %ledger.location(),
                "Loaded ledger"
            );
            registry.insert(ledger)?;
        }

        if let Some(metrics) = &metrics {
            metrics.set_tenants_loaded(registry.len());
        }

        if registry.is_empty() {
            tracing::warn!(dir = %dir.display(), "No ledgers found");
        }

        Ok(registry)
    }

    /// Build a registry from ledgers constructed elsewhere
    pub fn from_ledgers(ledgers: impl IntoIterator<Item = Ledger>) -> Result<Self> {
        let mut registry = Registry::default();
        for ledger in ledgers {
            registry.insert(ledger)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, ledger: Ledger) -> Result<()> {
        let identifier = ledger.identifier().to_string();
        if self.ledgers.contains_key(&identifier) {
            return Err(Error::DuplicateLedger(identifier));
        }
        self.ledgers.insert(identifier, Arc::new(ledger));
        Ok(())
    }

    /// Ledger for a tenant, if known
    pub fn get(&self, identifier: &str) -> Option<Arc<Ledger>> {
        self.ledgers.get(identifier).cloned()
    }

    /// Ledger for a tenant, or `Error::LedgerNotFound`
    pub fn require(&self, identifier: &str) -> Result<Arc<Ledger>> {
        self.get(identifier)
            .ok_or_else(|| Error::LedgerNotFound(identifier.to_string()))
    }

    /// Known tenant identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ledgers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of ledgers
    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    /// True if no ledger was loaded
    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
