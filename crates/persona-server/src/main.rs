//! persona-server
//!
//! Loads configuration, opens the store, serves until Ctrl-C, then drains
//! connections and closes the store.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::Serialized;
use persona_core::config::DEFAULT_CONFIG_FILE;
use persona_core::logging::init_logging;
use persona_core::{
    App, AppState, Config, MemoryStore, MysqlStore, PersonaStore, Server, StoreKind,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "persona-server")]
#[command(version)]
#[command(about = "JSON gateway for the persona table", long_about = None)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, env = "PERSONA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,
}

/// Flags that win over file and environment settings
#[derive(clap::Args, Serialize, Debug, Default)]
struct Overrides {
    /// Port to listen on
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    bind: Option<String>,

    /// Database host
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,

    /// Database port
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    db_port: Option<u16>,

    /// Database user
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,

    /// Database name
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,

    /// Runtime worker threads (0 = one per CPU)
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    workers: Option<usize>,

    /// Maximum JSON body size, e.g. 100kb
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    body_limit: Option<String>,

    /// Fallback 404 body: text or json
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    not_found_format: Option<NotFoundFormatArg>,

    /// Store backend: mysql or memory
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<StoreKindArg>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    json_logs: bool,
}

#[derive(clap::ValueEnum, Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
enum NotFoundFormatArg {
    Text,
    Json,
}

#[derive(clap::ValueEnum, Serialize, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
enum StoreKindArg {
    Mysql,
    Memory,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let figment = Config::figment(&cli.config).merge(Serialized::defaults(&cli.overrides));
    let config = Config::from_figment(&figment)
        .with_context(|| format!("loading configuration ({})", cli.config.display()))?;

    init_logging(&config.log_level, config.json_logs)?;

    let workers = config.worker_threads(num_cpus::get());
    let runtime = if workers == 1 {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .enable_all()
            .build()
    }
    .context("building tokio runtime")?;

    tracing::info!(
        workers,
        store = %config.store,
        not_found_format = ?config.not_found_format,
        "starting persona-server"
    );
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let store = open_store(&config).await?;

    let app = App::from_config(&config, AppState::new(store.clone()))?;
    let server = Server::new(Arc::new(app), config.server_config()?);
    let served = server.serve(shutdown_signal()).await;

    // Close the store even when serving failed
    if let Err(e) = store.close().await {
        tracing::error!(error = %e, "failed to close store");
    }
    served.context("serving HTTP")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn PersonaStore>> {
    match config.store {
        StoreKind::Mysql => {
            let options = config.database_options();
            let store = MysqlStore::connect(&options)
                .await
                .with_context(|| format!("connecting to MySQL at {}", options.address()))?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            tracing::warn!("using the in-memory store; records are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl-C"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
