use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/pacientes", get(handlers::list_patients))
        .with_state(config)
}
