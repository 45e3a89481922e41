// Copyright (c) cursorflow contributors
// SPDX-License-Identifier: Apache-2.0

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::DemoConfig;
use cursorflow_core::{ConsumeOptions, ConsumeOutcome, Hooks, IndexerBuilder};
use cursorflow_redis::{RedisCoordinator, RedisKvStore};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

/// Example CLI driving a single `Indexer<u64>` over Redis. `run` loops
/// `consume()` and a periodic `cleanup()` scan; `reset` clears the
/// indexer's coordination state so it restarts from its configured
/// initial value (spec §4.8).
#[derive(Parser)]
#[command(name = "cursorflow-demo")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Run {
        #[arg(long)]
        config_path: PathBuf,
    },
    Reset {
        #[arg(long)]
        config_path: PathBuf,
    },
}

fn load_config(path: &PathBuf) -> Result<DemoConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    serde_yaml::from_str(&raw).context("failed to parse config file as YAML")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { config_path } => run(load_config(&config_path)?).await,
        Command::Reset { config_path } => reset(load_config(&config_path)?).await,
    }
}

async fn run(config: DemoConfig) -> Result<()> {
    let coordinator = RedisCoordinator::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;
    let kv: RedisKvStore<u64> = RedisKvStore::connect(&config.redis_url)
        .await
        .context("failed to connect to redis for cursor storage")?;
    let initial_version = config.initial_version;
    let hooks = Hooks::new(|version: &u64| version + 1).with_initial(move || initial_version);
    let indexer = IndexerBuilder::new(config.indexer, hooks)
        .with_coordinator(Arc::new(coordinator))
        .with_kv_store(Arc::new(kv))
        .build()?;

    let mut since_last_cleanup = 0u32;
    loop {
        let outcome = indexer
            .consume(
                |start, ended, epoch| async move {
                    tracing::info!(start, ended, epoch, "processing interval");
                    Ok(())
                },
                ConsumeOptions::default(),
            )
            .await?;

        match outcome {
            ConsumeOutcome::Dispatched { .. } => {},
            ConsumeOutcome::AdmissionRejected | ConsumeOutcome::ReachedLatest => {
                tokio::time::sleep(Duration::from_millis(200)).await;
            },
        }

        since_last_cleanup += 1;
        if since_last_cleanup >= 50 {
            indexer.cleanup().await?;
            since_last_cleanup = 0;
        }
    }
}

async fn reset(config: DemoConfig) -> Result<()> {
    let coordinator = RedisCoordinator::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;
    let kv: RedisKvStore<u64> = RedisKvStore::connect(&config.redis_url)
        .await
        .context("failed to connect to redis for cursor storage")?;
    let hooks = Hooks::new(|version: &u64| version + 1);
    let indexer = IndexerBuilder::new(config.indexer.clone(), hooks)
        .with_coordinator(Arc::new(coordinator))
        .with_kv_store(Arc::new(kv))
        .build()?;
    indexer.reset().await?;
    tracing::info!(indexer = config.indexer.name, "indexer reset");
    Ok(())
}
