use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::warn;

use crate::models::{Availability, AvailabilityError, BookedSlot, DaySlots, ScheduleEntry};

/// The days and granularity a slot computation covers.
#[derive(Debug, Clone, Copy)]
pub struct SlotWindow {
    pub start_date: NaiveDate,
    pub horizon_days: i64,
    pub slot_minutes: i64,
    pub now: NaiveDateTime,
}

fn to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Step starts inside `[start, end)`.
fn walk(entry: &ScheduleEntry, step: Duration) -> Vec<NaiveTime> {
    let mut times = Vec::new();
    let mut current = entry.start_time;

    while current < entry.end_time {
        times.push(current);
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    times
}

/// Free slots per (date, branch) over the window, ordered by date then branch.
pub fn generate_slots(
    schedules: &[ScheduleEntry],
    booked: &[BookedSlot],
    window: &SlotWindow,
) -> Vec<DaySlots> {
    if window.slot_minutes <= 0 {
        warn!("Refusing to generate slots with a step of {} minutes", window.slot_minutes);
        return Vec::new();
    }
    let step = Duration::minutes(window.slot_minutes);

    let usable: Vec<&ScheduleEntry> = schedules
        .iter()
        .filter(|entry| {
            if entry.is_well_formed() {
                true
            } else {
                warn!(
                    "Ignoring schedule for doctor {} at branch {}: {} is not before {}",
                    entry.doctor_id, entry.branch_id, entry.start_time, entry.end_time
                );
                false
            }
        })
        .collect();

    let taken: HashSet<(NaiveDate, &str, NaiveTime)> = booked
        .iter()
        .filter(|slot| slot.status.blocks_slot())
        .map(|slot| (slot.date, slot.branch_id.as_str(), to_minute(slot.time)))
        .collect();

    let today = window.now.date();
    let cutoff = window.now.time();
    let mut grouped: BTreeMap<(NaiveDate, String), BTreeSet<NaiveTime>> = BTreeMap::new();

    for offset in 0..window.horizon_days.max(0) {
        let date = window.start_date + Duration::days(offset);
        let weekday = date.weekday();

        for entry in usable.iter().filter(|entry| entry.day_of_week == weekday) {
            for time in walk(entry, step) {
                if date == today && time < cutoff {
                    continue;
                }
                if taken.contains(&(date, entry.branch_id.as_str(), to_minute(time))) {
                    continue;
                }
                grouped
                    .entry((date, entry.branch_id.clone()))
                    .or_default()
                    .insert(time);
            }
        }
    }

    grouped
        .into_iter()
        .filter(|(_, times)| !times.is_empty())
        .map(|((date, branch_id), times)| DaySlots {
            date,
            branch_id,
            times: times.into_iter().collect(),
        })
        .collect()
}

/// Availability from today over the default horizon, or restricted to `target`.
/// `schedules` is the doctor's full week; `branch_id` narrows it afterwards, so a
/// branch without windows yields no slots rather than `NoScheduleConfigured`.
pub fn resolve_availability(
    schedules: &[ScheduleEntry],
    booked: &[BookedSlot],
    now: NaiveDateTime,
    default_horizon_days: i64,
    slot_minutes: i64,
    branch_id: Option<&str>,
    target: Option<NaiveDate>,
) -> Result<Availability, AvailabilityError> {
    if schedules.is_empty() {
        return Err(AvailabilityError::NoScheduleConfigured);
    }

    let scoped: Vec<ScheduleEntry> = schedules
        .iter()
        .filter(|entry| branch_id.is_none_or(|branch| entry.branch_id == branch))
        .cloned()
        .collect();
    let schedules = scoped.as_slice();

    let today = now.date();

    let Some(target) = target else {
        let window = SlotWindow {
            start_date: today,
            horizon_days: default_horizon_days,
            slot_minutes,
            now,
        };
        return Ok(Availability::Slots(generate_slots(schedules, booked, &window)));
    };

    if target < today {
        return Err(AvailabilityError::DateInPast(target));
    }

    let horizon_days = ((target - today).num_days() + 1).max(0);
    let window = SlotWindow {
        start_date: today,
        horizon_days,
        slot_minutes,
        now,
    };

    let on_target: Vec<DaySlots> = generate_slots(schedules, booked, &window)
        .into_iter()
        .filter(|day| day.date == target)
        .collect();

    if on_target.is_empty() && horizon_days >= 1 {
        Ok(Availability::NoneOnDate(target))
    } else {
        Ok(Availability::Slots(on_target))
    }
}
