use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    /// Port for the browser form front end (and /metrics, /healthz)
    pub http_port: u16,
    /// Port for the gRPC front end
    pub grpc_port: u16,
    pub log_level: String,
    pub log_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub endpoint: String,
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("EVENT_GATEWAY").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.http_port == 0 || cfg.server.grpc_port == 0 {
        anyhow::bail!("Server ports must be non-zero");
    }

    if cfg.server.http_port == cfg.server.grpc_port {
        anyhow::bail!(
            "HTTP and gRPC ports must differ (both set to {})",
            cfg.server.http_port
        );
    }

    cfg.server
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|_| anyhow::anyhow!("Invalid server host: {}", cfg.server.host))?;

    if cfg.metrics.enabled && !cfg.metrics.endpoint.starts_with('/') {
        anyhow::bail!(
            "Metrics endpoint must be an absolute path: {}",
            cfg.metrics.endpoint
        );
    }

    Ok(())
}
