//! HTTP API server for the order lifecycle service.
//!
//! Provides REST endpoints for order intake, status changes and the payment
//! provider webhook, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use lifecycle::{LifecycleConfig, OrderLifecycle};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use payments::{LogNotifier, Notifier, PaymentReconciler};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub lifecycle: OrderLifecycle<S>,
    pub reconciler: PaymentReconciler<S>,
    pub notifier: Arc<dyn Notifier>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .route("/users/{id}/orders", get(routes::orders::list_for_user::<S>))
        .route("/payments/webhook", post(routes::payments::webhook::<S>))
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

/// Wires the lifecycle controller, reconciler and notifier over `store`.
pub fn create_state<S: OrderStore + 'static>(
    store: S,
    lifecycle_config: LifecycleConfig,
    notifier: Arc<dyn Notifier>,
    currency: &str,
) -> Arc<AppState<S>> {
    let lifecycle = OrderLifecycle::new(store, lifecycle_config);
    let reconciler = PaymentReconciler::new(lifecycle.clone(), notifier.clone(), currency);

    Arc::new(AppState {
        lifecycle,
        reconciler,
        notifier,
    })
}

/// Creates the default application state: 30 minute window, RUB, log notifier.
pub fn create_default_state<S: OrderStore + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(
        store,
        LifecycleConfig::default(),
        Arc::new(LogNotifier),
        "RUB",
    )
}
