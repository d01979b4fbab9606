use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{decode_rows, SupabaseClient};

use crate::models::{PatientError, PatientSummary};

pub struct PatientService {
    supabase: SupabaseClient,
    patient_role_id: String,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patient_role_id: config.patient_role_id.clone(),
        }
    }

    /// Every account holding the patient role, alphabetically.
    pub async fn list_patients(&self) -> Result<Vec<PatientSummary>, PatientError> {
        let path = format!(
            "/rest/v1/usuarios?rol_id=eq.{}&select=nombre,email,telefono,foto_url&order=nombre.asc",
            urlencoding::encode(&self.patient_role_id)
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(PatientError::Store)?;

        let patients: Vec<PatientSummary> = decode_rows("usuarios", rows);
        debug!("Found {} patients", patients.len());

        if patients.is_empty() {
            return Err(PatientError::NoneFound);
        }

        Ok(patients)
    }
}
