use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/medicos", get(handlers::list_doctors))
        .route("/medicos/{doctor_id}/disponibilidad", get(handlers::get_availability));

    let admin_routes = Router::new()
        .route("/admin/medicos/{doctor_id}/disponibilidad", get(handlers::get_admin_availability))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
