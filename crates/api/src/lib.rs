//! HTTP surface over the command and query sides.
//!
//! Axum routes map REST verbs onto order commands and read-model queries.
//! tower-http adds request tracing and permissive CORS; a Prometheus
//! recorder handle serves the process metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::DispatcherConfig;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::ProjectionProcessor;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

fn order_routes<S: EventStore + Clone + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/api/orders", post(routes::orders::create::<S>))
        .route("/api/orders", get(routes::orders::list::<S>))
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/orders/{id}/items", post(routes::orders::add_item::<S>))
        .route(
            "/api/orders/{id}/items/{product_id}",
            delete(routes::orders::remove_item::<S>),
        )
        .route("/api/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route("/api/orders/{id}/process", post(routes::orders::process::<S>))
        .route("/api/orders/{id}/ship", post(routes::orders::ship::<S>))
        .route("/api/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/api/orders/{id}/shipping-address",
            put(routes::orders::update_shipping_address::<S>),
        )
        .route("/api/orders/{id}/events", get(routes::orders::events::<S>))
        .route(
            "/api/orders/customer/{customer_id}",
            get(routes::orders::by_customer::<S>),
        )
        .route(
            "/api/orders/status/{status}",
            get(routes::orders::by_status::<S>),
        )
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assembles the full router.
///
/// Order routes share [`AppState`]; `/metrics` owns the recorder handle;
/// every route passes through CORS and request tracing.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    order_routes()
        .route("/health", get(routes::health::live))
        .with_state(state)
        .merge(metrics)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
}

/// Creates application state wired with the given dispatcher configuration.
///
/// Spawns the projection worker that drains published events into the
/// order summary read model, so this must run inside a Tokio runtime.
/// The returned [`JoinHandle`] belongs to that worker; it exits once the
/// state (and with it the publisher) is dropped.
pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    dispatcher: DispatcherConfig,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    JoinHandle<()>,
) {
    use domain::OrderService;
    use projections::{
        ChannelPublisher, InMemoryReadModelStore, OrderSummaryProjection, Projection,
    };

    let read_model = InMemoryReadModelStore::new();
    let summaries = OrderSummaryProjection::new(read_model.clone());

    let mut processor = ProjectionProcessor::new(event_store.clone());
    processor.register(Box::new(summaries) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let (publisher, worker) = ChannelPublisher::spawn(processor.clone());
    let order_service = OrderService::with_config(event_store, publisher, dispatcher);

    let state = Arc::new(AppState {
        order_service,
        read_model,
        projection_processor: processor.clone(),
    });

    (state, processor, worker)
}

/// [`create_state`] with default dispatch settings.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    JoinHandle<()>,
) {
    create_state(event_store, DispatcherConfig::default())
}
