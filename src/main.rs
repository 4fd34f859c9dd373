//! WolfKV - Replicated Key-Value Store
//!
//! Runs a leader with its follower replicas behind an HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfkv::api::{AppState, HttpServer};
use wolfkv::config::WolfKvConfig;
use wolfkv::error::Result;
use wolfkv::replication::{ReplicaSet, ReplicationConfig, ReplicationCoordinator};
use wolfkv::wal::WalReader;

/// WolfKV - Replicated Key-Value Store
#[derive(Parser)]
#[command(name = "wolfkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfkv.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the leader, its followers and the HTTP API
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfkv.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "kv-1")]
        node_id: String,
    },

    /// Validate configuration file
    Validate,

    /// Show node information
    Info,

    /// Print the entries of a WAL file
    InspectWal {
        /// WAL file to read (defaults to the configured WAL)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => run_start(cli.config, cli.log_level).await,
        Commands::Init { output, node_id } => run_init(output, node_id),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
        Commands::InspectWal { path } => run_inspect_wal(cli.config, path),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if format == "compact" {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Start the replica set and serve the API until Ctrl+C
async fn run_start(config_path: PathBuf, log_level: Option<String>) -> Result<()> {
    let config = match WolfKvConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            init_logging(log_level.as_deref().unwrap_or("info"), "pretty");
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(e);
        }
    };

    let level = log_level.unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, &config.logging.format);

    tracing::info!("Starting WolfKV node {}", config.node.id);

    if let Err(e) = std::fs::create_dir_all(config.data_dir()) {
        tracing::error!("Failed to create data directory {:?}: {}", config.data_dir(), e);
        return Err(e.into());
    }

    let (replicas, report) = ReplicaSet::open(&config).await?;
    tracing::info!(
        "Recovered {} keys from WAL ({} entries, {} skipped)",
        replicas.leader().store().len().await,
        report.entries_read,
        report.lines_skipped
    );
    tracing::info!(
        "Replica set: leader + {} followers, default write quorum {}",
        replicas.follower_count(),
        config.replication.default_write_quorum
    );

    let replicas = Arc::new(replicas);
    let writer = ReplicationCoordinator::new(
        Arc::clone(&replicas),
        ReplicationConfig::from(&config.replication),
    );
    let state = Arc::new(AppState::new(config.node.id.clone(), Arc::clone(&replicas), writer));
    let http_server = HttpServer::new(config.api.clone(), state);

    tokio::select! {
        result = http_server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    // The API may be disabled, in which case start() returns at once
    if !config.api.enabled {
        tracing::info!("Waiting for shutdown signal");
        tokio::signal::ctrl_c().await?;
    }

    replicas.leader().sync().await?;
    tracing::info!("WAL synced, shutting down");

    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf, node_id: String) -> Result<()> {
    let config_content = format!(r#"# WolfKV Configuration
# Generated configuration file

[node]
id = "{node_id}"
data_dir = "/var/lib/wolfkv/{node_id}"

[wal]
file_name = "wolfkv.wal"
fsync = true

[replication]
quorum_timeout_ms = 2000
default_write_quorum = 1

[[replication.followers]]
name = "follower-1"
delay_ms = 200

[[replication.followers]]
name = "follower-2"
delay_ms = 500

[api]
enabled = true
bind_address = "0.0.0.0:8080"

[logging]
level = "info"
format = "pretty"
"#);

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: wolfkv --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match WolfKvConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Node ID: {}", config.node.id);
            println!("  WAL: {}", config.wal_path().display());
            println!("  Followers: {}", config.follower_count());
            println!("  Default Write Quorum: {}", config.replication.default_write_quorum);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show node information
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = WolfKvConfig::from_file(&config_path)?;

    println!("WolfKV Node Information");
    println!("=======================");
    println!();
    println!("Node ID:          {}", config.node.id);
    println!("Data Directory:   {}", config.data_dir().display());
    println!("API:              {}", if config.api.enabled { config.api.bind_address.as_str() } else { "disabled" });
    println!();
    println!("WAL Configuration:");
    println!("  Path:           {}", config.wal_path().display());
    println!("  Fsync:          {}", config.wal.fsync);
    println!();
    println!("Replication Configuration:");
    println!("  Quorum Timeout: {} ms", config.replication.quorum_timeout_ms);
    println!("  Default Quorum: {}", config.replication.default_write_quorum);
    println!("  Max Quorum:     {}", config.max_write_quorum());
    for (i, follower) in config.replication.followers.iter().enumerate() {
        let name = follower.name.clone().unwrap_or_else(|| format!("follower-{}", i + 1));
        println!("  {:<15} delay {} ms", name, follower.delay_ms);
    }

    Ok(())
}

/// Dump WAL entries as JSON lines
fn run_inspect_wal(config_path: PathBuf, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => WolfKvConfig::from_file(&config_path)?.wal_path(),
    };

    let scan = WalReader::new(&path).scan()?;
    for entry in &scan.entries {
        println!("{}  {} = {}", entry.timestamp.to_rfc3339(), entry.key, entry.value);
    }
    println!();
    println!("{} entries, {} malformed lines skipped", scan.entries.len(), scan.skipped);

    Ok(())
}
