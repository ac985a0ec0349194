use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::Any, cors::CorsLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{email, health, stats, transactions, users};
use domain::services::{Mailer, RecordStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn RecordStore>,
    pub mailer: Arc<dyn Mailer>,
}

pub fn create_app(config: Config, store: Arc<dyn RecordStore>, mailer: Arc<dyn Mailer>) -> Router {
    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        store,
        mailer,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Versioned API. The service-key check on the sensitive endpoints is
    // an extractor on the handlers themselves.
    let api_routes = Router::new()
        .route("/api/v1/transactions/lookup", post(transactions::lookup))
        .route(
            "/api/v1/transactions/export/:partner_id",
            get(transactions::export),
        )
        .route("/api/v1/users/export", get(users::export))
        .route("/api/v1/users/:user_id/retire", post(users::retire))
        .route("/api/v1/users/retire-sweep", post(users::retire_sweep))
        .route("/api/v1/stats/snapshot", post(stats::snapshot))
        .route("/api/v1/email/bulk-send", post(email::bulk_send));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/ping", get(health::health_check))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (each .layer wraps everything above it, so the
        // last one added is outermost)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .with_state(state)
}
