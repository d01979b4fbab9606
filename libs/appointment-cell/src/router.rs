use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let state = AppointmentState::new(config.clone());

    let public_routes = Router::new()
        .route("/citas", post(handlers::create_appointment))
        .route("/citas/futuras/{patient_id}", get(handlers::get_future_appointments))
        .route("/citas/historial/{patient_id}", get(handlers::get_appointment_history))
        .route("/citas/medico/{doctor_id}", get(handlers::get_doctor_agenda))
        .route("/citas/{appointment_id}/cancelar", patch(handlers::cancel_appointment))
        .route("/citas/{appointment_id}/completar", patch(handlers::complete_appointment))
        .route("/citas/{appointment_id}/reagendar", patch(handlers::reschedule_appointment));

    let admin_routes = Router::new()
        .route("/citas/todas", get(handlers::get_all_appointments))
        .route_layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
