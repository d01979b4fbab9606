use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AdminAvailabilityQuery, AvailabilityError, AvailabilityQuery, AvailabilityView};
use crate::services::{AvailabilityService, DoctorService};

pub const NO_SLOTS_ON_DATE: &str = "No hay horarios disponibles para esta fecha";

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Store(detail) => AppError::Database(detail),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

/// Blank query values count as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_target_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AvailabilityError> {
    non_blank(raw)
        .map(|value| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| AvailabilityError::InvalidDate(value.to_string()))
        })
        .transpose()
}

fn availability_body(view: AvailabilityView) -> Value {
    match view {
        AvailabilityView::Slots(slots) => json!(slots),
        AvailabilityView::NoneOnDate(date) => json!({
            "fecha": date.format("%Y-%m-%d").to_string(),
            "disponibilidad": [],
            "mensaje": NO_SLOTS_ON_DATE,
        }),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let doctor_service = DoctorService::new(&state);

    let doctors = doctor_service
        .list_doctors()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let target = parse_target_date(query.fecha.as_deref())?;
    let branch_id = non_blank(query.sucursal_id.as_deref());

    let availability_service = AvailabilityService::new(&state);
    let view = availability_service
        .doctor_availability(&doctor_id, branch_id, target, Local::now().naive_local())
        .await
        .inspect_err(|e| warn!("Availability for doctor {} rejected: {}", doctor_id, e))?;

    Ok(Json(availability_body(view)))
}

/// Same computation as the public endpoint, across every branch of the doctor.
#[axum::debug_handler]
pub async fn get_admin_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    Query(query): Query<AdminAvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let target = parse_target_date(query.fecha.as_deref())?;

    let availability_service = AvailabilityService::new(&state);
    let view = availability_service
        .doctor_availability(&doctor_id, None, target, Local::now().naive_local())
        .await
        .inspect_err(|e| warn!("Admin availability for doctor {} rejected: {}", doctor_id, e))?;

    Ok(Json(availability_body(view)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blank_date_is_no_date() {
        assert_eq!(parse_target_date(Some("  ")), Ok(None));
        assert_eq!(parse_target_date(None), Ok(None));
    }

    #[test]
    fn garbage_date_is_rejected() {
        assert_matches!(parse_target_date(Some("19/10/2026")), Err(AvailabilityError::InvalidDate(_)));
    }

    #[test]
    fn store_failures_are_server_errors() {
        assert_matches!(AppError::from(AvailabilityError::Store("down".into())), AppError::Database(_));
        assert_matches!(AppError::from(AvailabilityError::NoScheduleConfigured), AppError::BadRequest(_));
    }
}
