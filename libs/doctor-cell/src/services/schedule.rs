use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::decode_rows;
use shared_database::directory::in_filter;
use shared_database::supabase::SupabaseClient;
use shared_models::appointment::AppointmentStatus;

use crate::models::{BookedSlot, ScheduleEntry};

fn sort_by_week(entries: &mut [ScheduleEntry]) {
    entries.sort_by_key(|entry| {
        (entry.day_of_week.num_days_from_monday(), entry.start_time, entry.branch_id.clone())
    });
}

/// Read access to the `horarios` table.
pub struct ScheduleService {
    supabase: Arc<SupabaseClient>,
}

impl ScheduleService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Weekly windows of one doctor, optionally at one branch, ordered by weekday then start.
    pub async fn list_schedules(
        &self,
        doctor_id: &str,
        branch_id: Option<&str>,
    ) -> Result<Vec<ScheduleEntry>> {
        debug!("Listing schedules for doctor {} (branch {:?})", doctor_id, branch_id);

        let mut path = format!(
            "/rest/v1/horarios?medico_id=eq.{}",
            urlencoding::encode(doctor_id)
        );
        if let Some(branch_id) = branch_id {
            path.push_str(&format!("&sucursal_id=eq.{}", urlencoding::encode(branch_id)));
        }
        path.push_str("&select=*");

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        let mut entries: Vec<ScheduleEntry> = decode_rows("horarios", rows);
        sort_by_week(&mut entries);

        Ok(entries)
    }

    /// Weekly windows of several doctors in a single query.
    pub async fn list_for_doctors(&self, doctor_ids: &BTreeSet<String>) -> Result<Vec<ScheduleEntry>> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("/rest/v1/horarios?medico_id={}&select=*", in_filter(doctor_ids));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        let mut entries: Vec<ScheduleEntry> = decode_rows("horarios", rows);
        sort_by_week(&mut entries);

        Ok(entries)
    }

    /// Pending appointments of a doctor from `from` onwards, as slot occupancy.
    pub async fn pending_bookings(&self, doctor_id: &str, from: NaiveDate) -> Result<Vec<BookedSlot>> {
        let path = format!(
            "/rest/v1/citas?medico_id=eq.{}&estado=eq.{}&fecha=gte.{}&select=sucursal_id,fecha,hora,estado",
            urlencoding::encode(doctor_id),
            AppointmentStatus::Pending,
            from.format("%Y-%m-%d")
        );

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(decode_rows("citas", rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use serde_json::json;

    #[test]
    fn unreadable_rows_are_skipped() {
        let rows = vec![
            json!({"medico_id": "d", "sucursal_id": 1, "dia_semana": "Martes", "hora_inicio": "09:00:00", "hora_fin": "10:00:00"}),
            json!({"medico_id": "d", "sucursal_id": 1, "dia_semana": "Feriado", "hora_inicio": "09:00:00", "hora_fin": "10:00:00"}),
            json!({"medico_id": "d", "sucursal_id": 1, "dia_semana": "Lunes", "hora_inicio": "nueve", "hora_fin": "10:00:00"}),
        ];

        let entries: Vec<ScheduleEntry> = decode_rows("horarios", rows);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].branch_id, "1");
        assert_eq!(entries[0].day_of_week, Weekday::Tue);
    }

    #[test]
    fn entries_sort_by_weekday_then_start() {
        let at = |day, h| ScheduleEntry {
            doctor_id: "d".to_string(),
            branch_id: "b".to_string(),
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(h + 1, 0, 0).unwrap(),
        };
        let mut entries = vec![at(Weekday::Fri, 8), at(Weekday::Mon, 15), at(Weekday::Mon, 9)];

        sort_by_week(&mut entries);

        let order: Vec<(Weekday, u32)> = entries
            .iter()
            .map(|e| (e.day_of_week, chrono::Timelike::hour(&e.start_time)))
            .collect();
        assert_eq!(order, vec![(Weekday::Mon, 9), (Weekday::Mon, 15), (Weekday::Fri, 8)]);
    }
}
