use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::{Config, MetricsConfig},
    metrics,
    proto::event_gateway_server::EventGatewayServer,
    rpc::EventGatewayService,
    store::{EventStore, MemoryEventStore},
    web,
};

/// Start the Event Gateway: the gRPC front end and the browser form
/// front end share one store and one metrics registry.
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics());

    let store: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());

    let app = create_router(store.clone(), metrics_handle, &config.metrics);

    let host = config.server.host.parse::<std::net::IpAddr>()?;
    let http_addr = SocketAddr::from((host, config.server.http_port));
    let grpc_addr = SocketAddr::from((host, config.server.grpc_port));

    info!("Starting Event Gateway: http on {}, grpc on {}", http_addr, grpc_addr);

    // One shutdown broadcast feeds both servers.
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, draining connections...");
                let _ = shutdown_tx.send(());
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let mut http_shutdown = shutdown_tx.subscribe();
    let http_server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = http_shutdown.recv().await;
    });

    let mut grpc_shutdown = shutdown_tx.subscribe();
    let grpc_server = tonic::transport::Server::builder()
        .add_service(EventGatewayServer::new(EventGatewayService::new(store)))
        .serve_with_shutdown(grpc_addr, async move {
            let _ = grpc_shutdown.recv().await;
        });

    tokio::try_join!(
        async { http_server.await.map_err(anyhow::Error::from) },
        async { grpc_server.await.map_err(anyhow::Error::from) },
    )?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Build the axum router: the four form routes plus the observability
/// endpoints. The Prometheus scrape route is mounted at the configured
/// endpoint, or not at all when metrics are disabled.
pub fn create_router(
    store: Arc<dyn EventStore>,
    metrics_handle: Arc<PrometheusHandle>,
    metrics_cfg: &MetricsConfig,
) -> Router {
    let mut observability = Router::new().route("/healthz", get(healthz));
    if metrics_cfg.enabled {
        observability = observability.route(&metrics_cfg.endpoint, get(render_metrics));
    }
    observability
        .with_state(metrics_handle)
        .merge(web::router(store))
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe only; cannot detect store unavailability.
async fn healthz() -> &'static str {
    "OK"
}

async fn render_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}
