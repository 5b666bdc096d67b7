//! # Block Node Runtime
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging, optional OTLP trace export, metrics)
//! 2. Load configuration from `BN_*` environment variables
//! 3. Build the mediator and subscribe the verification feed
//! 4. Run until Ctrl+C, then stop accepting and release subscribers

use anyhow::{Context, Result};
use block_node_telemetry::{init_telemetry, TelemetryConfig};
use node_runtime::{BlockNode, BlockNodeConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .await
        .context("Failed to initialize telemetry")?;

    let config = BlockNodeConfig::from_env().context("Invalid block node configuration")?;
    let node = BlockNode::start(config)?;

    info!("Block node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    node.shutdown();
    Ok(())
}
