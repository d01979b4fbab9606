use std::sync::Arc;

use axum::{extract::State, Json};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{PatientError, PatientListResponse};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NoneFound => AppError::NotFound(err.to_string()),
            PatientError::Store(e) => AppError::Database(e.to_string()),
        }
    }
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<PatientListResponse>, AppError> {
    let service = PatientService::new(&config);

    let pacientes = service.list_patients().await?;

    Ok(Json(PatientListResponse { pacientes }))
}
