//! Binary entry point: process wiring and lifecycle.

use api::config::Config;
use domain::DispatcherConfig;
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// RUST_LOG wins over the configured level when both are set.
fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler");
        tokio::select! {
            result = signal::ctrl_c() => {
                result.expect("SIGINT handler");
                tracing::info!("SIGINT received, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("SIGINT handler");
        tracing::info!("SIGINT received, shutting down");
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    init_tracing(&config);

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("metrics recorder installation");

    let event_store = InMemoryEventStore::new();
    let dispatcher = DispatcherConfig {
        slot_timeout: config.command_timeout(),
        ..DispatcherConfig::default()
    };
    let (state, processor, _projection_worker) = api::create_state(event_store, dispatcher);

    // Replay whatever the log already holds before serving reads.
    processor.catch_up().await.expect("projection catch-up");

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("tcp bind");
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("http server");

    tracing::info!("shutdown complete");
}
