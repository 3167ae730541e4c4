//! doipctl - vehicle discovery from the command line
//!
//! Usage:
//!   doipctl [OPTIONS] [config.toml]
//!
//! Options:
//!   --window <ms>  Collection window for discovery responses
//!
//! Without a config file the client binds 0.0.0.0 and broadcasts to
//! 255.255.255.255:13400.

use std::time::Duration;

use doip_client::{ClientConfig, DiagClient, DiscoveryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parsed command-line arguments
struct Args {
    /// Client config file (TOML)
    config_path: Option<String>,
    /// Collection window override in milliseconds
    window_ms: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut result = Args {
        config_path: None,
        window_ms: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--window" | "-w" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("missing argument for --window"))?;
                result.window_ms = Some(value.parse()?);
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                result.config_path = Some(other.to_string());
                i += 1;
            }
        }
    }
    Ok(result)
}

fn print_help() {
    eprintln!(
        r#"doipctl - vehicle discovery over DoIP

Usage: doipctl [OPTIONS] [config.toml]

Options:
  -w, --window <ms>  Collection window for discovery responses
  -h, --help         Print this help message

Examples:
  # Broadcast on the default segment
  doipctl

  # Use a config file and wait 5 seconds for answers
  doipctl --window 5000 garage.toml
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doipctl=info,doip_client=info,doip_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;

    let mut config = if let Some(ref path) = args.config_path {
        tracing::info!("Loading config from: {}", path);
        let content = std::fs::read_to_string(path)?;
        ClientConfig::from_toml(&content)?
    } else {
        tracing::info!("No config file provided, using defaults");
        ClientConfig::default()
    };
    if let Some(window_ms) = args.window_ms {
        config.collect_window_ms = window_ms;
    }
    let window = Duration::from_millis(config.collect_window_ms);

    let client = DiagClient::new(config).await?;
    tracing::info!("Collecting responses for {:?}", window);

    match client.discover_vehicles_within(window).await {
        Ok(records) => {
            println!(
                "{:<19} {:<9} {:<15} {:<19} {}",
                "VIN", "ADDRESS", "IP", "EID", "GID"
            );
            for record in &records {
                println!(
                    "{:<19} {:<#9x} {:<15} {:<19} {}",
                    record.vin, record.logical_address, record.ip_address, record.eid, record.gid
                );
            }
        }
        Err(DiscoveryError::NoResponseReceived) => {
            println!("No vehicles responded within {window:?}");
        }
        Err(e) => {
            client.shutdown().await;
            return Err(e.into());
        }
    }

    client.shutdown().await;
    Ok(())
}
