// libs/appointment-cell/src/services/slots.rs
use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime};

use doctor_cell::services::schedule::WeeklySchedule;

use crate::models::AvailableSlot;

/// Slot width is fixed at one hour; the platform has no per-doctor slot
/// configuration today.
pub const SLOT_DURATION_MINUTES: i64 = 60;

/// Resolve the bookable slots for a doctor's day.
///
/// The schedule has already been repaired by `parse_or_default`, so this is
/// a total function: a disabled day or an empty time range yields an empty
/// sequence, never an error. Slots come back in chronological order with
/// `available` reflecting membership in `booked_times`.
pub fn resolve_available_slots(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    booked_times: &HashSet<NaiveTime>,
) -> Vec<AvailableSlot> {
    let day = schedule.day_for_date(date);
    if !day.enabled {
        return Vec::new();
    }

    generate_time_slots(day.start, day.end)
        .into_iter()
        .map(|time| AvailableSlot {
            time,
            available: !booked_times.contains(&time),
            date,
        })
        .collect()
}

/// Fixed-width slot times in [start, end). A slot is only emitted for its
/// start time; the final boundary is exclusive, so a range that does not
/// divide evenly simply loses the tail.
pub fn generate_time_slots(start: NaiveTime, end: NaiveTime) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    let mut current = start;

    while current < end {
        slots.push(current);
        let (next, wrapped) =
            current.overflowing_add_signed(Duration::minutes(SLOT_DURATION_MINUTES));
        if wrapped != 0 {
            // Ran past midnight; the working day is over.
            break;
        }
        current = next;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctor_cell::services::schedule::WeeklySchedule;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn schedule(raw: &str) -> WeeklySchedule {
        WeeklySchedule::parse_or_default(Some(raw))
    }

    // 2025-03-03 is a Monday, 2025-03-09 a Sunday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn default_working_day_yields_eight_hourly_slots() {
        let slots =
            resolve_available_slots(&WeeklySchedule::default(), monday(), &HashSet::new());

        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0].time, t(9, 0));
        assert_eq!(slots[7].time, t(16, 0));
        assert!(slots.iter().all(|s| s.available));
        assert!(slots.iter().all(|s| s.date == monday()));
    }

    #[test]
    fn disabled_day_yields_no_slots() {
        let slots =
            resolve_available_slots(&WeeklySchedule::default(), sunday(), &HashSet::new());
        assert!(slots.is_empty());
    }

    #[test]
    fn empty_time_range_yields_no_slots() {
        let sched = schedule(r#"{"Mon": {"enabled": true, "start": "17:00", "end": "09:00"}}"#);
        assert!(resolve_available_slots(&sched, monday(), &HashSet::new()).is_empty());

        let sched = schedule(r#"{"Mon": {"enabled": true, "start": "09:00", "end": "09:00"}}"#);
        assert!(resolve_available_slots(&sched, monday(), &HashSet::new()).is_empty());
    }

    #[test]
    fn uneven_range_drops_the_partial_tail() {
        // 09:00-10:30 only fits one whole hour.
        let sched = schedule(r#"{"Mon": {"enabled": true, "start": "09:00", "end": "10:30"}}"#);
        let slots = resolve_available_slots(&sched, monday(), &HashSet::new());

        assert_eq!(
            slots.iter().map(|s| s.time).collect::<Vec<_>>(),
            vec![t(9, 0), t(10, 0)]
        );
    }

    #[test]
    fn booked_times_are_marked_unavailable() {
        let booked: HashSet<NaiveTime> = [t(10, 0), t(14, 0)].into_iter().collect();
        let slots = resolve_available_slots(&WeeklySchedule::default(), monday(), &booked);

        for slot in &slots {
            assert_eq!(slot.available, !booked.contains(&slot.time), "at {}", slot.time);
        }
        assert_eq!(slots.iter().filter(|s| !s.available).count(), 2);
    }

    #[test]
    fn resolver_is_deterministic() {
        let booked: HashSet<NaiveTime> = [t(11, 0)].into_iter().collect();
        let first = resolve_available_slots(&WeeklySchedule::default(), monday(), &booked);
        let second = resolve_available_slots(&WeeklySchedule::default(), monday(), &booked);
        assert_eq!(first, second);
    }

    #[test]
    fn slots_are_chronological() {
        let slots =
            resolve_available_slots(&WeeklySchedule::default(), monday(), &HashSet::new());
        assert!(slots.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn late_night_range_stops_at_midnight() {
        let sched = schedule(r#"{"Mon": {"enabled": true, "start": "22:00", "end": "23:59"}}"#);
        let slots = resolve_available_slots(&sched, monday(), &HashSet::new());

        assert_eq!(
            slots.iter().map(|s| s.time).collect::<Vec<_>>(),
            vec![t(22, 0), t(23, 0)]
        );
    }

    #[test]
    fn monday_morning_scenario_with_confirmed_booking() {
        // Doctor works Monday 09:00-11:00 with a confirmed 10:00 appointment.
        let sched = schedule(r#"{"Mon": {"enabled": true, "start": "09:00", "end": "11:00"}}"#);
        let booked: HashSet<NaiveTime> = [t(10, 0)].into_iter().collect();

        let slots = resolve_available_slots(&sched, monday(), &booked);

        assert_eq!(slots.len(), 2);
        assert_eq!((slots[0].time, slots[0].available), (t(9, 0), true));
        assert_eq!((slots[1].time, slots[1].available), (t(10, 0), false));
    }
}
