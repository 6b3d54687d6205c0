use anyhow::Result;
use clap::Parser;
use triekv::common::NodeConfig;
use triekv::StorageNode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "triekv-node")]
#[command(about = "triekv storage node - trie-indexed replica server")]
struct Args {
    /// Address and port to listen on
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Config file/env layer, CLI flag on top
    let mut config: NodeConfig = triekv::Config::load().node.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    tracing::info!("Starting triekv storage node");
    tracing::info!("Listening on: {}", config.bind_addr);

    let node = StorageNode::bind(&config).await?;
    node.serve().await?;

    Ok(())
}
