use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_database::{NameDirectory, SupabaseClient};
use shared_utils::calendar::{format_clock, Calendar};

use crate::models::{Availability, AvailabilityError, AvailabilitySlot, AvailabilityView};
use crate::services::schedule::ScheduleService;
use crate::services::slots::resolve_availability;

fn store_error(e: anyhow::Error) -> AvailabilityError {
    error!("Availability lookup failed: {:#}", e);
    AvailabilityError::Store(e.to_string())
}

pub struct AvailabilityService {
    schedules: ScheduleService,
    directory: NameDirectory,
    calendar: Calendar,
    slot_minutes: i64,
    horizon_days: i64,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            schedules: ScheduleService::new(supabase.clone()),
            directory: NameDirectory::new(supabase),
            calendar: Calendar::from_tag(&config.calendar_locale),
            slot_minutes: config.slot_minutes,
            horizon_days: config.horizon_days,
        }
    }

    /// Free slots of a doctor from `now`, optionally limited to one branch or one date.
    pub async fn doctor_availability(
        &self,
        doctor_id: &str,
        branch_id: Option<&str>,
        target: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> Result<AvailabilityView, AvailabilityError> {
        debug!("Computing availability for doctor {} (branch {:?}, date {:?})", doctor_id, branch_id, target);

        let (schedules, booked) = futures::try_join!(
            self.schedules.list_schedules(doctor_id, None),
            self.schedules.pending_bookings(doctor_id, now.date()),
        )
        .map_err(store_error)?;

        let availability = resolve_availability(
            &schedules,
            &booked,
            now,
            self.horizon_days,
            self.slot_minutes,
            branch_id,
            target,
        )?;

        let days = match availability {
            Availability::NoneOnDate(date) => return Ok(AvailabilityView::NoneOnDate(date)),
            Availability::Slots(days) => days,
        };

        let branch_ids: BTreeSet<String> = days.iter().map(|day| day.branch_id.clone()).collect();
        let names = self
            .directory
            .branch_names(&branch_ids)
            .await
            .map_err(store_error)?;

        let slots = days
            .into_iter()
            .map(|day| AvailabilitySlot {
                fecha: day.date,
                sucursal_nombre: names
                    .get(&day.branch_id)
                    .cloned()
                    .unwrap_or_else(|| self.calendar.unknown_branch().to_string()),
                sucursal_id: day.branch_id,
                horas_disponibles: day.times.into_iter().map(format_clock).collect(),
            })
            .collect();

        Ok(AvailabilityView::Slots(slots))
    }
}
