use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_models::appointment::AppointmentStatus;
use shared_models::ids;
use shared_utils::calendar::{clock_hhmm, clock_hhmmss, weekday_serde};

// ==============================================================================
// SCHEDULE MODEL
// ==============================================================================

/// One recurring weekly office-hour window of a doctor at a branch (`horarios` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "medico_id", with = "ids")]
    pub doctor_id: String,
    #[serde(rename = "sucursal_id", with = "ids")]
    pub branch_id: String,
    #[serde(rename = "dia_semana", with = "weekday_serde")]
    pub day_of_week: Weekday,
    #[serde(rename = "hora_inicio", with = "clock_hhmmss")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_fin", with = "clock_hhmmss")]
    pub end_time: NaiveTime,
}

impl ScheduleEntry {
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Half-open: the start is bookable, the end is not.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

/// The part of an appointment row that decides slot occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSlot {
    #[serde(rename = "sucursal_id", with = "ids")]
    pub branch_id: String,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "hora", with = "clock_hhmm")]
    pub time: NaiveTime,
    #[serde(rename = "estado")]
    pub status: AppointmentStatus,
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(with = "ids")]
    pub id: String,
    pub nombre: String,
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub foto_url: Option<String>,
    #[serde(default, with = "ids::option")]
    pub rol_id: Option<String>,
    #[serde(default, with = "ids::option")]
    pub sucursal_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorWithSchedules {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub horarios: Vec<ScheduleEntry>,
    pub sucursal: Option<Value>,
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Free slot labels for one (date, branch) pair, before branch names are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub branch_id: String,
    pub times: Vec<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Slots(Vec<DaySlots>),
    /// A specific date was requested and nothing is free on it.
    NoneOnDate(NaiveDate),
}

/// Response row of the availability endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub fecha: NaiveDate,
    pub sucursal_id: String,
    pub sucursal_nombre: String,
    pub horas_disponibles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityView {
    Slots(Vec<AvailabilitySlot>),
    NoneOnDate(NaiveDate),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub sucursal_id: Option<String>,
    pub fecha: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminAvailabilityQuery {
    pub fecha: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("No hay horarios para este médico")]
    NoScheduleConfigured,

    #[error("La fecha {0} ya pasó")]
    DateInPast(NaiveDate),

    #[error("Fecha inválida: {0}")]
    InvalidDate(String),

    #[error("Store error: {0}")]
    Store(String),
}
