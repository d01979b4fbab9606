use std::fmt;

use serde::{Deserialize, Serialize};

/// Appointment status as stored in the `citas.estado` column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    #[serde(rename = "pendiente", alias = "pending")]
    Pending,
    #[serde(rename = "cancelada", alias = "cancelled")]
    Cancelled,
    #[serde(rename = "completada", alias = "completed")]
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pendiente",
            AppointmentStatus::Cancelled => "cancelada",
            AppointmentStatus::Completed => "completada",
        }
    }

    /// Only pending appointments occupy a slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
