use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::FormBody;

use crate::models::{
    AppointmentError, BookingRequest, CreateAppointmentForm, RescheduleQuery, RescheduleRequest,
};
use crate::services::{AppointmentLifecycle, SlotLocks};

/// Router state: configuration plus the process-wide per-doctor write locks.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub locks: SlotLocks,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            locks: SlotLocks::new(),
        }
    }

    fn lifecycle(&self) -> AppointmentLifecycle {
        AppointmentLifecycle::new(&self.config, self.locks.clone())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Store(e) => AppError::Database(e.to_string()),
            AppointmentError::Validation(_)
            | AppointmentError::MissingField(_)
            | AppointmentError::InitialStatus(_)
            | AppointmentError::NotReschedulable(_) => AppError::ValidationError(err.to_string()),
        }
    }
}

// ==============================================================================
// WRITE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    FormBody(form): FormBody<CreateAppointmentForm>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = BookingRequest::try_from(form)?;

    let cita = state
        .lifecycle()
        .create(booking, Local::now().naive_local())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Cita creada correctamente",
            "cita": cita
        })),
    ))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let cita = state.lifecycle().cancel(&appointment_id).await?;

    Ok(Json(json!({
        "message": "Cita cancelada correctamente",
        "cita": cita
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let cita = state.lifecycle().complete(&appointment_id).await?;

    Ok(Json(json!({
        "message": "Cita completada",
        "cita": cita
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<String>,
    Query(query): Query<RescheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let request = RescheduleRequest::try_from(query)?;

    let cita = state
        .lifecycle()
        .reschedule(&appointment_id, request, Local::now().naive_local())
        .await?;

    Ok(Json(json!({
        "message": "Cita reagendada correctamente",
        "cita": cita
    })))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_future_appointments(
    State(state): State<AppointmentState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let citas = state
        .lifecycle()
        .list_future_for_patient(&patient_id, Local::now().date_naive())
        .await?;

    Ok(Json(json!(citas)))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(state): State<AppointmentState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let citas = state.lifecycle().list_history_for_patient(&patient_id).await?;

    Ok(Json(json!(citas)))
}

#[axum::debug_handler]
pub async fn get_doctor_agenda(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let citas = state.lifecycle().list_for_doctor(&doctor_id).await?;

    Ok(Json(json!(citas)))
}

#[axum::debug_handler]
pub async fn get_all_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} listing every appointment", user.id);

    let citas = state.lifecycle().list_all().await?;

    Ok(Json(json!(citas)))
}
