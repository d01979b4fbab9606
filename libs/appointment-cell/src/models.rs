use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::appointment::AppointmentStatus;
use shared_models::ids;
use shared_utils::calendar::clock_hhmm;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A `citas` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(with = "ids")]
    pub id: String,
    #[serde(rename = "paciente_id", with = "ids")]
    pub patient_id: String,
    #[serde(rename = "medico_id", with = "ids")]
    pub doctor_id: String,
    #[serde(rename = "sucursal_id", with = "ids")]
    pub branch_id: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "hora", with = "clock_hhmm")]
    pub time: NaiveTime,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "comentarios", default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    #[serde(rename = "paciente_id")]
    pub patient_id: String,
    #[serde(rename = "medico_id")]
    pub doctor_id: String,
    #[serde(rename = "sucursal_id")]
    pub branch_id: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "hora", with = "clock_hhmm")]
    pub time: NaiveTime,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
    #[serde(rename = "comentarios")]
    pub comments: String,
}

/// Columns a reschedule may touch. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentChanges {
    #[serde(rename = "fecha", skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "hora", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "sucursal_id", skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    #[serde(rename = "medico_id", skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAppointmentForm {
    pub paciente_id: Option<String>,
    pub medico_id: Option<String>,
    pub sucursal_id: Option<String>,
    pub fecha: Option<String>,
    pub hora: Option<String>,
    pub estado: Option<String>,
    pub comentarios: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RescheduleQuery {
    pub fecha: Option<String>,
    pub hora: Option<String>,
    pub sucursal_id: Option<String>,
    pub medico_id_param: Option<String>,
}

/// A booking after the form has been checked for presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub branch_id: String,
    pub date: String,
    pub time: String,
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleRequest {
    pub date: String,
    pub time: String,
    pub branch_id: String,
    pub doctor_id: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AppointmentError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppointmentError::MissingField(field))
}

impl TryFrom<CreateAppointmentForm> for BookingRequest {
    type Error = AppointmentError;

    fn try_from(form: CreateAppointmentForm) -> Result<Self, Self::Error> {
        if let Some(estado) = form.estado.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if estado != AppointmentStatus::Pending.as_str() {
                return Err(AppointmentError::InitialStatus(estado.to_string()));
            }
        }

        Ok(Self {
            patient_id: required(form.paciente_id, "paciente_id")?,
            doctor_id: required(form.medico_id, "medico_id")?,
            branch_id: required(form.sucursal_id, "sucursal_id")?,
            date: required(form.fecha, "fecha")?,
            time: required(form.hora, "hora")?,
            comments: form.comentarios.unwrap_or_default(),
        })
    }
}

impl TryFrom<RescheduleQuery> for RescheduleRequest {
    type Error = AppointmentError;

    fn try_from(query: RescheduleQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            date: required(query.fecha, "fecha")?,
            time: required(query.hora, "hora")?,
            branch_id: required(query.sucursal_id, "sucursal_id")?,
            doctor_id: query
                .medico_id_param
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

// ==============================================================================
// ENRICHED VIEWS
// ==============================================================================

/// Upcoming appointment as shown to the patient.
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingAppointment {
    pub id: String,
    pub fecha: NaiveDate,
    pub fecha_formateada: String,
    pub hora: String,
    pub estado: AppointmentStatus,
    pub comentarios: String,
    pub medico: String,
    pub sucursal: String,
}

/// Full row plus display fields; used for the history and reschedule responses.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub cita: Appointment,
    pub fecha_formateada: String,
    pub dia: String,
    pub medico: String,
    pub sucursal: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminAppointment {
    pub id: String,
    pub paciente: String,
    pub medico: String,
    pub sucursal: String,
    pub fecha: NaiveDate,
    pub hora: String,
    pub fecha_formateada: String,
    pub estado: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorAgendaEntry {
    pub id: String,
    pub fecha: NaiveDate,
    pub fecha_formateada: String,
    pub dia: String,
    pub hora: String,
    pub estado: AppointmentStatus,
    pub comentarios: String,
    pub paciente_nombre: String,
    pub sucursal: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Reasons a proposed booking is refused, in the order they are checked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Formato de fecha u hora inválido: {0}")]
    BadFormat(String),

    #[error("No se puede agendar una cita en una fecha u hora pasada")]
    PastDateTime,

    #[error("El médico no tiene horarios en esta sucursal")]
    NoSchedule,

    #[error("El médico no está disponible en la fecha y hora seleccionadas")]
    OutsideHours,

    #[error("El médico ya tiene una cita pendiente en esa fecha y hora")]
    SlotTaken,
}

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Falta el campo obligatorio: {0}")]
    MissingField(&'static str),

    #[error("Las citas nuevas deben crearse como pendiente, no como '{0}'")]
    InitialStatus(String),

    #[error("Solo se pueden reagendar citas pendientes (estado actual: {0})")]
    NotReschedulable(AppointmentStatus),

    #[error("Cita no encontrada")]
    NotFound,

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn rows_decode_with_numeric_ids_and_seconds() {
        let row = json!({
            "id": 42,
            "paciente_id": "p-1",
            "medico_id": "d-1",
            "sucursal_id": 3,
            "fecha": "2026-10-19",
            "hora": "09:00:00",
            "estado": "pendiente",
            "comentarios": null
        });

        let cita: Appointment = serde_json::from_value(row).unwrap();
        assert_eq!(cita.id, "42");
        assert_eq!(cita.branch_id, "3");
        assert_eq!(serde_json::to_value(&cita).unwrap()["hora"], "09:00");
    }

    #[test]
    fn form_defaults_to_pending_and_rejects_other_states() {
        let form = CreateAppointmentForm {
            paciente_id: Some("p".into()),
            medico_id: Some("d".into()),
            sucursal_id: Some("s".into()),
            fecha: Some("2026-10-19".into()),
            hora: Some("09:00".into()),
            ..Default::default()
        };
        assert!(BookingRequest::try_from(form.clone()).is_ok());

        let completed = CreateAppointmentForm {
            estado: Some("completada".into()),
            ..form
        };
        assert_matches!(BookingRequest::try_from(completed), Err(AppointmentError::InitialStatus(_)));
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let query = RescheduleQuery {
            fecha: Some("2026-10-19".into()),
            hora: Some(" ".into()),
            sucursal_id: Some("s".into()),
            medico_id_param: Some(String::new()),
        };
        assert_matches!(RescheduleRequest::try_from(query), Err(AppointmentError::MissingField("hora")));
    }

    #[test]
    fn changes_only_serialize_what_is_set() {
        let changes = AppointmentChanges {
            time: Some("10:30".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&changes).unwrap(), json!({"hora": "10:30"}));
    }
}
