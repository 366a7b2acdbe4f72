use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ledger: splitledger_core::Config,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = splitledger_core::Config::default();

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 18000)?
            .set_default("server.workers", 4)?
            .set_default(
                "ledger.datastores_dir",
                defaults.datastores_dir.to_string_lossy().to_string(),
            )?
            .set_default("ledger.file_extension", defaults.file_extension)?
            .set_default("ledger.write_mode", "atomic_rename")?
            .set_default("ledger.verify_on_load", defaults.verify_on_load)?
            .set_default("logging.filter", "info")?
            .set_default("logging.json", false)?;

        // Optional config file
        let config_file = env::var("CONFIG_FILE").unwrap_or_else(|_| "splitledger".to_string());
        builder = builder.add_source(File::with_name(&config_file).required(false));

        // Override with environment variables
        builder = builder.add_source(Environment::with_prefix("SPLITLEDGER").separator("__"));

        if let Ok(port) = env::var("SPLITLEDGER_PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.with_ledger_overrides(|key| env::var(key).ok())
    }

    /// Apply the ledger shortcut variables (`SPLITLEDGER_DATASTORES`,
    /// `SPLITLEDGER_WRITE_MODE`, `SPLITLEDGER_VERIFY_ON_LOAD`) on top of the
    /// layered sources
    pub fn with_ledger_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        self.ledger = self
            .ledger
            .with_env_overrides(lookup)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.server.workers == 0 {
            return Err("Server workers must be at least 1".to_string());
        }

        self.ledger.validate().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitledger_core::WriteMode;
    use std::path::PathBuf;

    fn sample() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 18000,
                workers: 2,
            },
            ledger: splitledger_core::Config::default(),
            logging: LoggingConfig {
                filter: "info".to_string(),
                json: false,
            },
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = sample();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ledger_shortcut_overrides() {
        let config = sample()
            .with_ledger_overrides(|key| match key {
                "SPLITLEDGER_WRITE_MODE" => Some("in_place".to_string()),
                "SPLITLEDGER_VERIFY_ON_LOAD" => Some("false".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.ledger.write_mode, WriteMode::InPlace);
        assert!(!config.ledger.verify_on_load);
        assert_eq!(config.ledger.datastores_dir, PathBuf::from("./datastores"));

        let err = sample()
            .with_ledger_overrides(|key| (key == "SPLITLEDGER_WRITE_MODE").then(|| "fast".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("write mode"));
    }

    // The only test in this crate that touches the process environment
    #[test]
    fn test_from_env_reads_ledger_shortcuts() {
        env::set_var("SPLITLEDGER_DATASTORES", "/srv/ledgers");
        env::set_var("SPLITLEDGER_WRITE_MODE", "in_place");
        env::set_var("SPLITLEDGER_VERIFY_ON_LOAD", "false");
        let config = Config::from_env();
        env::remove_var("SPLITLEDGER_DATASTORES");
        env::remove_var("SPLITLEDGER_WRITE_MODE");
        env::remove_var("SPLITLEDGER_VERIFY_ON_LOAD");

        let config = config.unwrap();
        assert_eq!(config.ledger.datastores_dir, PathBuf::from("/srv/ledgers"));
        assert_eq!(config.ledger.write_mode, WriteMode::InPlace);
        assert!(!config.ledger.verify_on_load);
        assert_eq!(config.server.port, 18000);
    }

    #[test]
    fn test_validate_rejects_empty_datastores() {
        let mut config = sample();
        config.ledger.datastores_dir = PathBuf::new();
        assert!(config.validate().unwrap_err().contains("datastores"));
    }
}
