pub mod auth;
pub mod error;
pub mod metrics;
pub mod predict;
pub mod validation;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServeMode;
use crate::ui;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let app_routes = match state.config.server.mode {
        // Stateless form page; no accounts, no history
        ServeMode::Demo => ui::demo_router(),
        ServeMode::Accounts => ui::accounts_router()
            .route("/predict", post(predict::predict))
            .route("/me", get(auth::me)),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .route("/static/*path", get(ui::static_asset))
        .merge(app_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
