//! TOML config file, merged with CLI overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cryptonote_consensus_rules::CurrencyParameters;

/// On-disk daemon configuration, deserialized from TOML and overridden by
/// whatever [`crate::Args`] the user passed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Directory the block store, secondary indexes and mempool snapshot
    /// live under.
    pub data_dir: PathBuf,
    /// Run against the alternate emission/difficulty parameter set.
    pub testnet: bool,
    /// Optional path to a checkpoints file (`height,hash` per line).
    pub checkpoints_file: Option<PathBuf>,
    /// Maximum number of transactions the mempool keeps resident.
    pub pool_size: usize,
    /// Target block time, in seconds, difficulty retargets towards.
    pub difficulty_target: u64,
    /// `tracing_subscriber` `EnvFilter` directive, e.g. `"info"` or
    /// `"cryptonote_blockchain=debug,info"`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            testnet: false,
            checkpoints_file: None,
            pool_size: 4_096,
            difficulty_target: 120,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Loads a config file if `path` exists, otherwise falls back to
    /// [`Config::default`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The currency parameter set this config selects.
    #[must_use]
    pub fn currency_parameters(&self) -> CurrencyParameters {
        if self.testnet {
            CurrencyParameters::testnet()
        } else {
            CurrencyParameters::mainnet()
        }
    }
}

/// The daemon's default data directory: `<user data dir>/cryptonoted`.
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cryptonoted")
}

/// A config file could not be read or parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = Config::load(Path::new("/nonexistent/cryptonoted.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn loads_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cryptonoted.toml");
        std::fs::write(&path, "testnet = true\npool_size = 16\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.testnet);
        assert_eq!(config.pool_size, 16);
        // Fields absent from the file keep their defaults.
        assert_eq!(config.difficulty_target, 120);
    }
}
