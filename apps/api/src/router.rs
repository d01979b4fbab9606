use std::sync::Arc;

use axum::{
    Json,
    Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use auth_cell::router::{auth_routes, user_routes};
use clinic_cell::router::clinic_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

async fn root() -> Json<Value> {
    Json(json!({ "message": "Servidor desplegado" }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/auth", auth_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(doctor_routes(state.clone()))
        .merge(appointment_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(clinic_routes(state))
}
