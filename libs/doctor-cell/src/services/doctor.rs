use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{decode_rows, NameDirectory, SupabaseClient};

use crate::models::{Doctor, DoctorWithSchedules, ScheduleEntry};
use crate::services::schedule::ScheduleService;

const DOCTOR_COLUMNS: &str = "id,nombre,email,telefono,foto_url,rol_id,sucursal_id";

pub struct DoctorService {
    supabase: Arc<SupabaseClient>,
    schedules: ScheduleService,
    directory: NameDirectory,
    doctor_role_id: String,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            schedules: ScheduleService::new(supabase.clone()),
            directory: NameDirectory::new(supabase.clone()),
            supabase,
            doctor_role_id: config.doctor_role_id.clone(),
        }
    }

    /// Every user with the doctor role, with their weekly schedule and home branch.
    pub async fn list_doctors(&self) -> Result<Vec<DoctorWithSchedules>> {
        debug!("Listing doctors with role {}", self.doctor_role_id);

        let path = format!(
            "/rest/v1/usuarios?rol_id=eq.{}&select={}&order=nombre.asc",
            urlencoding::encode(&self.doctor_role_id),
            DOCTOR_COLUMNS
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        let doctors: Vec<Doctor> = decode_rows("usuarios", rows);

        let doctor_ids: BTreeSet<String> = doctors.iter().map(|d| d.id.clone()).collect();
        let branch_ids: BTreeSet<String> = doctors.iter().filter_map(|d| d.sucursal_id.clone()).collect();

        let (schedules, branches) = futures::try_join!(
            self.schedules.list_for_doctors(&doctor_ids),
            self.directory.rows_by_id("sucursales", "*", &branch_ids),
        )?;

        let mut by_doctor: HashMap<String, Vec<ScheduleEntry>> = HashMap::new();
        for entry in schedules {
            by_doctor.entry(entry.doctor_id.clone()).or_default().push(entry);
        }

        info!("Found {} doctors", doctors.len());

        Ok(doctors
            .into_iter()
            .map(|doctor| {
                let horarios = by_doctor.remove(&doctor.id).unwrap_or_default();
                let sucursal = doctor
                    .sucursal_id
                    .as_ref()
                    .and_then(|id| branches.get(id))
                    .cloned();
                DoctorWithSchedules { doctor, horarios, sucursal }
            })
            .collect())
    }
}
