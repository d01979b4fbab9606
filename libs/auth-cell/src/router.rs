use std::sync::Arc;

use axum::{
    Router,
    routing::post,
};

use shared_config::AppConfig;

use crate::handlers;

/// Account routes, nested under `/auth`.
pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/validate", post(handlers::validate_token))
        .with_state(state)
}

pub fn user_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/usuarios", post(handlers::create_user))
        .with_state(state)
}
