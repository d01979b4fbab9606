use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn clinic_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/roles", get(handlers::list_roles))
        .route("/sucursales", get(handlers::list_branches))
        .with_state(config)
}
