pub mod config;
pub mod domain;
pub mod error;
pub mod instrument;
pub mod metrics;
pub mod rpc;
pub mod server;
pub mod store;
pub mod web;

/// Generated gRPC types and service stubs.
pub mod proto {
    tonic::include_proto!("eventgateway");
}

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging from the server configuration. RUST_LOG
/// overrides the configured level; `log_format = "json"` switches to
/// structured output.
///
/// Note: This function can only be called once.
pub fn init_tracing(cfg: &config::ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cfg.log_format == "json" {
        registry.with(fmt::layer().with_target(true).json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
