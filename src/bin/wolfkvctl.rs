//! WolfKvCtl - Command line client for a WolfKV node
//!
//! Usage:
//!   wolfkvctl put <key> <value>             - Fire-and-forget write
//!   wolfkvctl quorum-put <key> <value> -w 2 - Write and wait for acknowledgments
//!   wolfkvctl get <key> [--replica N]       - Read from the leader or a follower
//!   wolfkvctl repair-get <key>              - Read with read-repair
//!   wolfkvctl status                        - Show node status

use clap::{Parser, Subcommand};
use serde::Deserialize;

/// WolfKV Control Tool
#[derive(Parser)]
#[command(name = "wolfkvctl")]
#[command(about = "Read and write a WolfKV replica set", long_about = None)]
struct Cli {
    /// API endpoint to connect to
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a value without waiting for followers
    Put { key: String, value: String },
    /// Write a value and wait for a write quorum
    QuorumPut {
        key: String,
        value: String,
        /// Replicas that must acknowledge, leader included (defaults to the node's setting)
        #[arg(short)]
        w: Option<usize>,
    },
    /// Read a value from the leader, or from one follower
    Get {
        key: String,
        /// Follower ordinal (1-based)
        #[arg(long)]
        replica: Option<usize>,
    },
    /// Read the newest value across all replicas, repairing stale ones
    RepairGet { key: String },
    /// Show status of the node
    Status,
}

// ============ API Response Types ============

#[derive(Debug, Deserialize)]
struct RecordResponse {
    key: String,
    value: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    node_id: String,
    followers: usize,
    max_write_quorum: usize,
    default_write_quorum: usize,
    quorum_timeout_ms: u64,
    leader_keys: usize,
    wal_path: String,
    #[serde(default)]
    uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    code: String,
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = cli.endpoint.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Put { key, value } => put(&endpoint, &key, &value).await,
        Commands::QuorumPut { key, value, w } => quorum_put(&endpoint, &key, &value, w).await,
        Commands::Get { key, replica } => get(&endpoint, &key, replica).await,
        Commands::RepairGet { key } => repair_get(&endpoint, &key).await,
        Commands::Status => show_status(&endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Turn a non-success response into an error carrying the server's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorResponse>().await {
        Ok(body) if !body.code.is_empty() => Err(format!("{} ({}): {}", status, body.code, body.error).into()),
        Ok(body) => Err(format!("{}: {}", status, body.error).into()),
        Err(_) => Err(format!("API error: {}", status).into()),
    }
}

fn print_record(record: &RecordResponse) {
    println!("{} = {}", record.key, record.value);
    println!("  written at {}", record.timestamp);
}

// ============ Commands ============

async fn put(endpoint: &str, key: &str, value: &str) -> CmdResult {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/write", endpoint))
        .json(&serde_json::json!({ "key": key, "value": value }))
        .send()
        .await?;
    check(response).await?;

    println!("OK");
    Ok(())
}

async fn quorum_put(endpoint: &str, key: &str, value: &str, w: Option<usize>) -> CmdResult {
    let client = reqwest::Client::new();
    let mut body = serde_json::json!({ "key": key, "value": value });
    if let Some(w) = w {
        body["w"] = serde_json::json!(w);
    }

    let response = client
        .post(format!("{}/write-with-quorum", endpoint))
        .json(&body)
        .send()
        .await?;
    check(response).await?;

    match w {
        Some(w) => println!("OK (w={})", w),
        None => println!("OK"),
    }
    Ok(())
}

async fn get(endpoint: &str, key: &str, replica: Option<usize>) -> CmdResult {
    let client = reqwest::Client::new();
    let request = match replica {
        Some(n) => client
            .get(format!("{}/follower-read", endpoint))
            .query(&[("key", key.to_string()), ("replica", n.to_string())]),
        None => client.get(format!("{}/read", endpoint)).query(&[("key", key)]),
    };

    let response = check(request.send().await?).await?;
    let record: RecordResponse = response.json().await?;
    print_record(&record);
    Ok(())
}

async fn repair_get(endpoint: &str, key: &str) -> CmdResult {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/read-with-repair", endpoint))
        .query(&[("key", key)])
        .send()
        .await?;

    let record: RecordResponse = check(response).await?.json().await?;
    print_record(&record);
    Ok(())
}

async fn show_status(endpoint: &str) -> CmdResult {
    let client = reqwest::Client::new();
    let response = client.get(format!("{}/status", endpoint)).send().await?;
    let status: StatusResponse = check(response).await?.json().await?;

    println!();
    println!("Node Status");
    println!("===========");
    println!();
    println!("Node ID:        {}", status.node_id);
    println!("Followers:      {}", status.followers);
    println!("Write Quorum:   {} (max {})", status.default_write_quorum, status.max_write_quorum);
    println!("Quorum Timeout: {} ms", status.quorum_timeout_ms);
    println!("Leader Keys:    {}", status.leader_keys);
    println!("WAL:            {}", status.wal_path);
    println!("Uptime:         {}s", status.uptime_seconds);
    println!();

    Ok(())
}
