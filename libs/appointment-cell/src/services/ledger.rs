use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_database::{decode_rows, SupabaseClient};
use shared_models::appointment::AppointmentStatus;

use crate::models::{Appointment, AppointmentChanges, NewAppointment};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first: date then time ascending.
    #[default]
    Chronological,
    /// Newest first: date then time descending.
    Latest,
}

/// Query over `citas`. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
    pub branch_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub order: SortOrder,
}

impl AppointmentFilter {
    fn to_query(&self) -> String {
        let mut params = vec!["select=*".to_string()];

        let eq = |column: &str, value: &str| format!("{}=eq.{}", column, urlencoding::encode(value));
        if let Some(id) = &self.doctor_id {
            params.push(eq("medico_id", id));
        }
        if let Some(id) = &self.patient_id {
            params.push(eq("paciente_id", id));
        }
        if let Some(id) = &self.branch_id {
            params.push(eq("sucursal_id", id));
        }
        if let Some(date) = self.date {
            params.push(format!("fecha=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(date) = self.date_from {
            params.push(format!("fecha=gte.{}", date.format("%Y-%m-%d")));
        }
        if let Some(status) = self.status {
            params.push(format!("estado=eq.{}", status));
        }

        params.push(match self.order {
            SortOrder::Chronological => "order=fecha.asc,hora.asc".to_string(),
            SortOrder::Latest => "order=fecha.desc,hora.desc".to_string(),
        });

        params.join("&")
    }
}

/// Reads and writes of the `citas` table.
pub struct AppointmentLedger {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentLedger {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        let path = format!("/rest/v1/citas?{}", filter.to_query());
        debug!("Listing appointments: {}", path);

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(decode_rows("citas", rows))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Appointment>> {
        let path = format!("/rest/v1/citas?id=eq.{}&select=*", urlencoding::encode(id));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        first_row(rows)
    }

    pub async fn insert(&self, appointment: &NewAppointment) -> Result<Appointment> {
        let rows = self
            .supabase
            .request_returning(Method::POST, "/rest/v1/citas", None, json!(appointment))
            .await?;

        first_row(rows)?.ok_or_else(|| anyhow!("Insert into citas returned no rows"))
    }

    /// `None` when no row has this id.
    pub async fn update_status(&self, id: &str, status: AppointmentStatus) -> Result<Option<Appointment>> {
        self.patch(id, json!({ "estado": status })).await
    }

    /// `None` when no row has this id.
    pub async fn update_fields(&self, id: &str, changes: &AppointmentChanges) -> Result<Option<Appointment>> {
        self.patch(id, json!(changes)).await
    }

    async fn patch(&self, id: &str, body: Value) -> Result<Option<Appointment>> {
        let path = format!("/rest/v1/citas?id=eq.{}", urlencoding::encode(id));
        let rows = self
            .supabase
            .request_returning(Method::PATCH, &path, None, body)
            .await?;

        first_row(rows)
    }
}

fn first_row(rows: Vec<Value>) -> Result<Option<Appointment>> {
    rows.into_iter()
        .next()
        .map(serde_json::from_value::<Appointment>)
        .transpose()
        .map_err(|e| anyhow!("Unreadable citas row: {}", e))
}
