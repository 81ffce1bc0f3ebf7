//! `cryptonoted`: opens the block store, checkpoint set and mempool for a
//! CryptoNote-family chain and reports the resulting chain state. Networking
//! and wallet functionality are out of scope for this engine; this binary
//! only wires together the storage and validation crates.

mod args;
mod checkpoints;
mod config;
mod logging;

use clap::Parser;

use crate::args::Args;
use crate::config::Config;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from("cryptonoted.toml"));
    let config = Config::load(&config_path)?;
    let config = args.apply(config);

    logging::init(&config.log_level);

    tracing::info!(data_dir = %config.data_dir.display(), testnet = config.testnet, "starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let checkpoints = checkpoints::load(config.checkpoints_file.as_deref())?;
    let difficulty_config = cryptonote_consensus_rules::DifficultyConfig::with_target(config.difficulty_target);

    let engine = cryptonote_blockchain::Engine::open(
        &config.data_dir,
        config.currency_parameters(),
        checkpoints,
        difficulty_config,
        Vec::new(),
        config.pool_size,
    )?;

    match engine.top_height() {
        Some(height) => tracing::info!(height, "chain store opened"),
        None => tracing::info!("chain store opened, empty"),
    }

    Ok(())
}
