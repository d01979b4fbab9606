use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use doctor_cell::services::ScheduleService;
use shared_config::AppConfig;
use shared_database::{NameDirectory, SupabaseClient, SupabaseError};
use shared_models::appointment::AppointmentStatus;
use shared_utils::calendar::{format_clock, Calendar};

use crate::models::{
    AdminAppointment, Appointment, AppointmentChanges, AppointmentDetail, AppointmentError,
    BookingRequest, DoctorAgendaEntry, NewAppointment, RescheduleRequest, UpcomingAppointment,
    ValidationError,
};
use crate::services::ledger::{AppointmentFilter, AppointmentLedger, SortOrder};
use crate::services::locks::SlotLocks;
use crate::services::validator::{parse_slot, validate_booking, EligibleBooking, ProposedSlot};

fn store_error(e: anyhow::Error) -> AppointmentError {
    if SupabaseError::is_conflict(&e) {
        warn!("Store rejected a duplicate pending appointment: {}", e);
        return AppointmentError::Validation(ValidationError::SlotTaken);
    }
    error!("Appointment store operation failed: {:#}", e);
    AppointmentError::Store(e)
}

/// id -> display name maps for one batch of appointments.
struct Names {
    users: HashMap<String, String>,
    branches: HashMap<String, String>,
}

pub struct AppointmentLifecycle {
    ledger: AppointmentLedger,
    schedules: ScheduleService,
    directory: NameDirectory,
    calendar: Calendar,
    locks: SlotLocks,
}

impl AppointmentLifecycle {
    pub fn new(config: &AppConfig, locks: SlotLocks) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self {
            ledger: AppointmentLedger::new(supabase.clone()),
            schedules: ScheduleService::new(supabase.clone()),
            directory: NameDirectory::new(supabase),
            calendar: Calendar::from_tag(&config.calendar_locale),
            locks,
        }
    }

    // ==========================================================================
    // STATE TRANSITIONS
    // ==========================================================================

    pub async fn create(
        &self,
        booking: BookingRequest,
        now: NaiveDateTime,
    ) -> Result<Appointment, AppointmentError> {
        let _guard = self.locks.acquire(&booking.doctor_id).await;

        let slot = ProposedSlot {
            doctor_id: &booking.doctor_id,
            branch_id: &booking.branch_id,
            date: &booking.date,
            time: &booking.time,
            exclude_id: None,
        };
        let eligible = self.check_slot(&slot, now).await?;

        let cita = self
            .ledger
            .insert(&NewAppointment {
                patient_id: booking.patient_id,
                doctor_id: booking.doctor_id,
                branch_id: booking.branch_id,
                date: eligible.date,
                time: eligible.time,
                status: AppointmentStatus::Pending,
                comments: booking.comments,
            })
            .await
            .map_err(store_error)?;

        info!(
            "Appointment {} booked with doctor {} at branch {} on {} {}",
            cita.id, cita.doctor_id, cita.branch_id, cita.date, format_clock(cita.time)
        );
        Ok(cita)
    }

    /// Idempotent: an already cancelled appointment stays cancelled.
    pub async fn cancel(&self, id: &str) -> Result<Appointment, AppointmentError> {
        let cita = self
            .ledger
            .update_status(id, AppointmentStatus::Cancelled)
            .await
            .map_err(store_error)?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} cancelled", id);
        Ok(cita)
    }

    pub async fn complete(&self, id: &str) -> Result<Appointment, AppointmentError> {
        let cita = self
            .ledger
            .update_status(id, AppointmentStatus::Completed)
            .await
            .map_err(store_error)?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} completed", id);
        Ok(cita)
    }

    /// Moves a pending appointment in place; the id does not change.
    pub async fn reschedule(
        &self,
        id: &str,
        request: RescheduleRequest,
        now: NaiveDateTime,
    ) -> Result<AppointmentDetail, AppointmentError> {
        let original = self
            .ledger
            .get(id)
            .await
            .map_err(store_error)?
            .ok_or(AppointmentError::NotFound)?;

        if original.status != AppointmentStatus::Pending {
            return Err(AppointmentError::NotReschedulable(original.status));
        }

        let doctor_id = request.doctor_id.clone().unwrap_or_else(|| original.doctor_id.clone());
        let _guard = self.locks.acquire(&doctor_id).await;

        let slot = ProposedSlot {
            doctor_id: &doctor_id,
            branch_id: &request.branch_id,
            date: &request.date,
            time: &request.time,
            exclude_id: Some(&original.id),
        };
        let eligible = self.check_slot(&slot, now).await?;

        let changes = AppointmentChanges {
            date: Some(eligible.date),
            time: Some(format_clock(eligible.time)),
            branch_id: Some(request.branch_id.clone()),
            doctor_id: (doctor_id != original.doctor_id).then(|| doctor_id.clone()),
        };
        let moved = self
            .ledger
            .update_fields(id, &changes)
            .await
            .map_err(store_error)?
            .ok_or(AppointmentError::NotFound)?;

        info!(
            "Appointment {} moved from {} {} to {} {}",
            id,
            original.date,
            format_clock(original.time),
            moved.date,
            format_clock(moved.time)
        );

        let names = self.names_for(std::slice::from_ref(&moved)).await?;
        Ok(self.detail(moved, &names))
    }

    /// Parse, fetch what the validator needs, and validate.
    async fn check_slot(
        &self,
        slot: &ProposedSlot<'_>,
        now: NaiveDateTime,
    ) -> Result<EligibleBooking, AppointmentError> {
        let (date, _) = parse_slot(slot.date, slot.time)?;

        let filter = AppointmentFilter {
            doctor_id: Some(slot.doctor_id.to_string()),
            branch_id: Some(slot.branch_id.to_string()),
            date: Some(date),
            status: Some(AppointmentStatus::Pending),
            ..Default::default()
        };

        let (schedules, appointments) = futures::try_join!(
            self.schedules.list_schedules(slot.doctor_id, Some(slot.branch_id)),
            self.ledger.list(&filter),
        )
        .map_err(store_error)?;

        validate_booking(slot, &schedules, &appointments, now).map_err(|reason| {
            warn!(
                "Booking for doctor {} at branch {} on {} {} refused: {:?}",
                slot.doctor_id, slot.branch_id, slot.date, slot.time, reason
            );
            AppointmentError::Validation(reason)
        })
    }

    // ==========================================================================
    // READ VIEWS
    // ==========================================================================

    pub async fn list_future_for_patient(
        &self,
        patient_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<UpcomingAppointment>, AppointmentError> {
        let citas = self
            .ledger
            .list(&AppointmentFilter {
                patient_id: Some(patient_id.to_string()),
                date_from: Some(today),
                order: SortOrder::Chronological,
                ..Default::default()
            })
            .await
            .map_err(store_error)?;

        let names = self.names_for(&citas).await?;

        Ok(citas
            .into_iter()
            .map(|cita| UpcomingAppointment {
                fecha_formateada: self.calendar.long_date(cita.date),
                hora: format_clock(cita.time),
                medico: self.user_name(&names, &cita.doctor_id),
                sucursal: self.branch_name(&names, &cita.branch_id),
                comentarios: cita.comments.unwrap_or_default(),
                id: cita.id,
                fecha: cita.date,
                estado: cita.status,
            })
            .collect())
    }

    pub async fn list_history_for_patient(
        &self,
        patient_id: &str,
    ) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        let citas = self
            .ledger
            .list(&AppointmentFilter {
                patient_id: Some(patient_id.to_string()),
                order: SortOrder::Latest,
                ..Default::default()
            })
            .await
            .map_err(store_error)?;

        let names = self.names_for(&citas).await?;

        Ok(citas.into_iter().map(|cita| self.detail(cita, &names)).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<AdminAppointment>, AppointmentError> {
        let citas = self
            .ledger
            .list(&AppointmentFilter::default())
            .await
            .map_err(store_error)?;

        let names = self.names_for(&citas).await?;

        Ok(citas
            .into_iter()
            .map(|cita| AdminAppointment {
                paciente: self.user_name(&names, &cita.patient_id),
                medico: self.user_name(&names, &cita.doctor_id),
                sucursal: self.branch_name(&names, &cita.branch_id),
                hora: format_clock(cita.time),
                fecha_formateada: self.calendar.long_date(cita.date),
                id: cita.id,
                fecha: cita.date,
                estado: cita.status,
            })
            .collect())
    }

    pub async fn list_for_doctor(&self, doctor_id: &str) -> Result<Vec<DoctorAgendaEntry>, AppointmentError> {
        let citas = self
            .ledger
            .list(&AppointmentFilter {
                doctor_id: Some(doctor_id.to_string()),
                ..Default::default()
            })
            .await
            .map_err(store_error)?;

        let names = self.names_for(&citas).await?;

        Ok(citas
            .into_iter()
            .map(|cita| DoctorAgendaEntry {
                fecha_formateada: self.calendar.short_date(cita.date),
                dia: self.calendar.weekday_label(cita.date).to_string(),
                hora: format_clock(cita.time),
                paciente_nombre: self.user_name(&names, &cita.patient_id),
                sucursal: self.branch_name(&names, &cita.branch_id),
                comentarios: cita.comments.unwrap_or_default(),
                id: cita.id,
                fecha: cita.date,
                estado: cita.status,
            })
            .collect())
    }

    // ==========================================================================
    // ENRICHMENT
    // ==========================================================================

    /// One `usuarios` and one `sucursales` lookup for the whole batch, issued together.
    async fn names_for(&self, citas: &[Appointment]) -> Result<Names, AppointmentError> {
        let user_ids: BTreeSet<String> = citas
            .iter()
            .flat_map(|cita| [cita.patient_id.clone(), cita.doctor_id.clone()])
            .collect();
        let branch_ids: BTreeSet<String> = citas.iter().map(|cita| cita.branch_id.clone()).collect();

        let (users, branches) = futures::try_join!(
            self.directory.user_names(&user_ids),
            self.directory.branch_names(&branch_ids),
        )
        .map_err(store_error)?;

        Ok(Names { users, branches })
    }

    fn user_name(&self, names: &Names, id: &str) -> String {
        names
            .users
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.calendar.unknown_person().to_string())
    }

    fn branch_name(&self, names: &Names, id: &str) -> String {
        names
            .branches
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.calendar.unknown_branch().to_string())
    }

    fn detail(&self, cita: Appointment, names: &Names) -> AppointmentDetail {
        AppointmentDetail {
            fecha_formateada: self.calendar.short_date(cita.date),
            dia: self.calendar.weekday_label(cita.date).to_string(),
            medico: self.user_name(names, &cita.doctor_id),
            sucursal: self.branch_name(names, &cita.branch_id),
            cita,
        }
    }
}
