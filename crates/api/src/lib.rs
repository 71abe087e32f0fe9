//! HTTP boundary of the purchase service.
//!
//! Accepts orders over REST, runs them through the purchase [`Dispatcher`]
//! and exposes health and Prometheus metrics endpoints, with structured
//! logging (tracing) on every request.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use purchase::consumers::{CHECK_PERSISTER, REPLY_COMPOSER, STOCK_VALIDATOR};
use purchase::{CheckPersister, Dispatcher, ReplyComposer, StockValidator};
use store::{InMemoryProductStore, ProductStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::purchase::AppState;

/// Products served when no database is configured: `(name, cost, amount)`.
pub const DEMO_PRODUCTS: [(&str, i64, i64); 4] = [
    ("apple", 200, 50),
    ("melon", 200, 10),
    ("banana", 90, 120),
    ("kiwi", 35, 1000),
];

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ProductStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route(
            "/",
            get(routes::purchase::hello).post(routes::purchase::buy::<S>),
        )
        .route("/health", get(routes::health::check::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the stock validator, check persister and reply composer over `store`.
pub fn create_dispatcher<S: ProductStore + Clone + 'static>(store: S) -> Dispatcher<S> {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(StockValidator::new(STOCK_VALIDATOR, store.clone()));
    dispatcher.register(CheckPersister::new(CHECK_PERSISTER, store.clone()));
    dispatcher.register(ReplyComposer::new(REPLY_COMPOSER, store));
    dispatcher
}

/// Builds an in-memory store holding [`DEMO_PRODUCTS`].
pub async fn demo_store() -> InMemoryProductStore {
    InMemoryProductStore::with_products(DEMO_PRODUCTS).await
}
