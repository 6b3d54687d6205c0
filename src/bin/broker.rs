//! Broker binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use triekv::broker::{read_node_list, read_record_stream};
use triekv::common::BrokerConfig;
use triekv::Broker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "triekv-broker")]
#[command(about = "triekv broker - indexes records and coordinates storage nodes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-index the record stream, then serve the interactive command loop
    Serve {
        /// File listing storage nodes, one "<address> <port>" per line
        #[arg(short, long)]
        servers: Option<PathBuf>,

        /// File of pre-flattened records to index
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Replication factor
        #[arg(short = 'k', long)]
        replication: Option<usize>,

        /// Per-node request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            servers,
            data,
            replication,
            timeout_ms,
        } => {
            // Load config from file/env, then override with CLI arguments
            let mut config = triekv::Config::load().broker.unwrap_or_default();
            if let Some(servers) = servers {
                config.server_file = servers;
            }
            if let Some(data) = data {
                config.data_file = data;
            }
            if let Some(replication) = replication {
                config.replication = replication;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.request_timeout_ms = timeout_ms;
            }
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: BrokerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting broker");
    tracing::info!("  Node list: {}", config.server_file.display());
    tracing::info!("  Record stream: {}", config.data_file.display());
    tracing::info!("  Replication factor: {}", config.replication);

    let nodes = read_node_list(&config.server_file).await?;
    let records = read_record_stream(&config.data_file).await?;

    let broker = Broker::new(nodes, config.replication, config.request_timeout())?;
    broker.index_records(&records).await?;

    tracing::info!("✓ Broker ready ({} records indexed)", records.len());

    broker.run_repl().await?;
    Ok(())
}
