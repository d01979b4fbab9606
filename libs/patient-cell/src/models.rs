use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Public card for a patient account; never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub nombre: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub foto_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientListResponse {
    pub pacientes: Vec<PatientSummary>,
}

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("No se encontraron pacientes")]
    NoneFound,

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}
