use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use doctor_cell::models::ScheduleEntry;
use shared_utils::calendar::parse_clock;

use crate::models::{Appointment, ValidationError};

/// A proposed (doctor, branch, date, time), still in wire form.
#[derive(Debug, Clone, Copy)]
pub struct ProposedSlot<'a> {
    pub doctor_id: &'a str,
    pub branch_id: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    /// The appointment being moved, which must not conflict with itself.
    pub exclude_id: Option<&'a str>,
}

/// A slot that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibleBooking {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Parse `YYYY-MM-DD` and `HH:MM` (seconds tolerated, then dropped).
pub fn parse_slot(date: &str, time: &str) -> Result<(NaiveDate, NaiveTime), ValidationError> {
    let parsed_date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::BadFormat(date.to_string()))?;
    let parsed_time = parse_clock(time)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| ValidationError::BadFormat(time.to_string()))?;

    Ok((parsed_date, parsed_time))
}

/// Decide whether `slot` may become a pending appointment.
///
/// Checks run in a fixed order and stop at the first failure: format, past
/// moment, schedule at the branch, office hours on that weekday, then
/// conflicts with other pending appointments.
pub fn validate_booking(
    slot: &ProposedSlot<'_>,
    schedules: &[ScheduleEntry],
    appointments: &[Appointment],
    now: NaiveDateTime,
) -> Result<EligibleBooking, ValidationError> {
    let (date, time) = parse_slot(slot.date, slot.time)?;

    if date.and_time(time) < now {
        return Err(ValidationError::PastDateTime);
    }

    let at_branch: Vec<&ScheduleEntry> = schedules
        .iter()
        .filter(|entry| entry.doctor_id == slot.doctor_id && entry.branch_id == slot.branch_id)
        .collect();
    if at_branch.is_empty() {
        return Err(ValidationError::NoSchedule);
    }

    let within_hours = at_branch.iter().any(|entry| {
        entry.day_of_week == date.weekday() && entry.is_well_formed() && entry.contains(time)
    });
    if !within_hours {
        return Err(ValidationError::OutsideHours);
    }

    let taken = appointments.iter().any(|cita| {
        cita.status.blocks_slot()
            && cita.doctor_id == slot.doctor_id
            && cita.branch_id == slot.branch_id
            && cita.date == date
            && cita.time.hour() == time.hour()
            && cita.time.minute() == time.minute()
            && slot.exclude_id != Some(cita.id.as_str())
    });
    if taken {
        return Err(ValidationError::SlotTaken);
    }

    Ok(EligibleBooking { date, time })
}
