//! # Block Node Telemetry
//!
//! Observability for the block node streaming core.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Tracing**: OpenTelemetry spans exported over OTLP when an endpoint is set
//! - **Metrics**: Prometheus collectors owned by [`BlockNodeMetrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use block_node_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).await?;
//!     // Application code here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP endpoint; tracing export is off when unset |
//! | `OTEL_SERVICE_NAME` | `block-node` | Service name in traces |
//! | `BN_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BN_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `BN_JSON_LOGS` | `false` | JSON formatted logs |

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{BlockNodeMetrics, ChannelMetrics, VerificationMetrics, METRICS};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging, tracing export and the process-wide metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first (synchronous)
    lazy_static::initialize(&METRICS);

    let tracing = match config.otlp_endpoint {
        Some(_) => Some(tracing_setup::init_tracing(&config).await?),
        None => {
            logging::init_logging(&config)?;
            None
        }
    };

    Ok(TelemetryGuard { _tracing: tracing })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: Option<TracingGuard>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
