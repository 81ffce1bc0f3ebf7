//! Command-line flags layered on top of the config file.

use std::path::PathBuf;

use crate::config::Config;

/// `cryptonoted` — a CryptoNote-family storage and validation node.
#[derive(clap::Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to the TOML config file. Missing is not an error: defaults apply.
    #[arg(long)]
    pub config_file: Option<PathBuf>,
    /// Overrides `data_dir`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Overrides `testnet`.
    #[arg(long)]
    pub testnet: bool,
    /// Overrides `checkpoints_file`.
    #[arg(long)]
    pub checkpoints_file: Option<PathBuf>,
    /// Overrides `pool_size`.
    #[arg(long)]
    pub pool_size: Option<usize>,
    /// Overrides `log_level`.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Applies the CLI overrides on top of a loaded [`Config`].
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if self.testnet {
            config.testnet = true;
        }
        if let Some(checkpoints_file) = &self.checkpoints_file {
            config.checkpoints_file = Some(checkpoints_file.clone());
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        config
    }
}
