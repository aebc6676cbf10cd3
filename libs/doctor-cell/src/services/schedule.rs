// libs/doctor-cell/src/services/schedule.rs
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

/// Closed set of weekday tags used to key a doctor's weekly schedule.
/// Derived from the date's weekday number, never from locale names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekdayTag {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl WeekdayTag {
    pub const ALL: [WeekdayTag; 7] = [
        WeekdayTag::Mon,
        WeekdayTag::Tue,
        WeekdayTag::Wed,
        WeekdayTag::Thu,
        WeekdayTag::Fri,
        WeekdayTag::Sat,
        WeekdayTag::Sun,
    ];

    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => WeekdayTag::Mon,
            chrono::Weekday::Tue => WeekdayTag::Tue,
            chrono::Weekday::Wed => WeekdayTag::Wed,
            chrono::Weekday::Thu => WeekdayTag::Thu,
            chrono::Weekday::Fri => WeekdayTag::Fri,
            chrono::Weekday::Sat => WeekdayTag::Sat,
            chrono::Weekday::Sun => WeekdayTag::Sun,
        }
    }

    /// Accepts both abbreviated and full day names; legacy rows stored either.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Mon" | "Monday" => Some(WeekdayTag::Mon),
            "Tue" | "Tuesday" => Some(WeekdayTag::Tue),
            "Wed" | "Wednesday" => Some(WeekdayTag::Wed),
            "Thu" | "Thursday" => Some(WeekdayTag::Thu),
            "Fri" | "Friday" => Some(WeekdayTag::Fri),
            "Sat" | "Saturday" => Some(WeekdayTag::Sat),
            "Sun" | "Sunday" => Some(WeekdayTag::Sun),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            WeekdayTag::Mon => "Mon",
            WeekdayTag::Tue => "Tue",
            WeekdayTag::Wed => "Wed",
            WeekdayTag::Thu => "Thu",
            WeekdayTag::Fri => "Fri",
            WeekdayTag::Sat => "Sat",
            WeekdayTag::Sun => "Sun",
        }
    }

    fn index(&self) -> usize {
        match self {
            WeekdayTag::Mon => 0,
            WeekdayTag::Tue => 1,
            WeekdayTag::Wed => 2,
            WeekdayTag::Thu => 3,
            WeekdayTag::Fri => 4,
            WeekdayTag::Sat => 5,
            WeekdayTag::Sun => 6,
        }
    }

    fn is_weekend(&self) -> bool {
        matches!(self, WeekdayTag::Sat | WeekdayTag::Sun)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule must be a JSON object keyed by weekday")]
    NotAnObject,

    #[error("unknown day key: {0}")]
    UnknownDay(String),

    #[error("invalid entry for {day}: {reason}")]
    InvalidEntry { day: String, reason: String },

    #[error("empty time range for {0}: start must be before end")]
    EmptyRange(&'static str),
}

/// A doctor's working week: one entry per weekday. Stored on the doctor
/// row as JSON text; malformed persisted data is repaired to the default
/// on read, while the write path validates strictly.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

const DEFAULT_START: &str = "09:00";
const DEFAULT_END: &str = "17:00";

fn default_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).unwrap()
}

impl Default for WeeklySchedule {
    /// Mon-Fri 09:00-17:00, weekend off.
    fn default() -> Self {
        let mut days = [DaySchedule {
            enabled: true,
            start: default_start(),
            end: default_end(),
        }; 7];
        for day in WeekdayTag::ALL {
            if day.is_weekend() {
                days[day.index()].enabled = false;
            }
        }
        Self { days }
    }
}

impl WeeklySchedule {
    pub fn day(&self, day: WeekdayTag) -> &DaySchedule {
        &self.days[day.index()]
    }

    pub fn day_for_date(&self, date: NaiveDate) -> &DaySchedule {
        self.day(WeekdayTag::from_date(date))
    }

    /// Silent-repair read path: a missing, malformed, or structurally
    /// invalid schedule yields the default working week. Callers never see
    /// a parse failure for persisted configuration.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match Self::parse_lenient(raw) {
            Ok(schedule) => schedule,
            Err(e) => {
                debug!("repairing unparsable schedule with default: {}", e);
                Self::default()
            }
        }
    }

    fn parse_lenient(raw: &str) -> Result<Self, ScheduleError> {
        let value: Value = serde_json::from_str(raw).map_err(|_| ScheduleError::NotAnObject)?;
        let map = value.as_object().ok_or(ScheduleError::NotAnObject)?;

        // Days absent from the stored object simply don't have hours.
        let mut days = [DaySchedule {
            enabled: false,
            start: default_start(),
            end: default_end(),
        }; 7];

        for (key, entry) in map {
            let Some(day) = WeekdayTag::from_key(key) else {
                // Foreign keys in legacy rows are skipped, not fatal.
                continue;
            };
            days[day.index()] = Self::parse_entry(day, entry, false)?;
        }

        Ok(Self { days })
    }

    /// Strict parse for the write path: every key must be a known weekday,
    /// every entry must carry a boolean flag and parseable times, and an
    /// enabled day must span a non-empty range.
    pub fn from_value(value: &Value) -> Result<Self, ScheduleError> {
        let map = value.as_object().ok_or(ScheduleError::NotAnObject)?;

        let mut days = [DaySchedule {
            enabled: false,
            start: default_start(),
            end: default_end(),
        }; 7];

        for (key, entry) in map {
            let day = WeekdayTag::from_key(key)
                .ok_or_else(|| ScheduleError::UnknownDay(key.clone()))?;
            let parsed = Self::parse_entry(day, entry, true)?;
            if parsed.enabled && parsed.start >= parsed.end {
                return Err(ScheduleError::EmptyRange(day.key()));
            }
            days[day.index()] = parsed;
        }

        Ok(Self { days })
    }

    fn parse_entry(day: WeekdayTag, entry: &Value, strict: bool) -> Result<DaySchedule, ScheduleError> {
        let obj = entry.as_object().ok_or_else(|| ScheduleError::InvalidEntry {
            day: day.key().to_string(),
            reason: "entry must be an object".to_string(),
        })?;

        let enabled = match obj.get("enabled") {
            Some(Value::Bool(b)) => *b,
            None if !strict => false,
            Some(other) => {
                return Err(ScheduleError::InvalidEntry {
                    day: day.key().to_string(),
                    reason: format!("enabled must be a boolean, got {}", other),
                })
            }
            None => {
                return Err(ScheduleError::InvalidEntry {
                    day: day.key().to_string(),
                    reason: "missing enabled flag".to_string(),
                })
            }
        };

        let start = Self::parse_time_field(day, obj, "start", DEFAULT_START, strict)?;
        let end = Self::parse_time_field(day, obj, "end", DEFAULT_END, strict)?;

        Ok(DaySchedule { enabled, start, end })
    }

    fn parse_time_field(
        day: WeekdayTag,
        obj: &Map<String, Value>,
        field: &str,
        fallback: &str,
        strict: bool,
    ) -> Result<NaiveTime, ScheduleError> {
        let raw = match obj.get(field) {
            Some(Value::String(s)) if !s.is_empty() => s.as_str(),
            None | Some(Value::Null) | Some(Value::String(_)) if !strict => fallback,
            _ => {
                return Err(ScheduleError::InvalidEntry {
                    day: day.key().to_string(),
                    reason: format!("missing or non-string {} time", field),
                })
            }
        };

        parse_time(raw).ok_or_else(|| ScheduleError::InvalidEntry {
            day: day.key().to_string(),
            reason: format!("unparsable {} time: {}", field, raw),
        })
    }

    /// Canonical storage form: abbreviated keys, HH:MM times, all seven days.
    pub fn to_storage_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for day in WeekdayTag::ALL {
            let entry = self.day(day);
            map.insert(
                day.key().to_string(),
                json!({
                    "enabled": entry.enabled,
                    "start": entry.start.format("%H:%M").to_string(),
                    "end": entry.end.format("%H:%M").to_string(),
                }),
            );
        }
        Value::Object(map)
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn missing_schedule_falls_back_to_default() {
        let schedule = WeeklySchedule::parse_or_default(None);

        assert!(schedule.day(WeekdayTag::Mon).enabled);
        assert!(schedule.day(WeekdayTag::Fri).enabled);
        assert!(!schedule.day(WeekdayTag::Sat).enabled);
        assert!(!schedule.day(WeekdayTag::Sun).enabled);
        assert_eq!(schedule.day(WeekdayTag::Wed).start, t(9, 0));
        assert_eq!(schedule.day(WeekdayTag::Wed).end, t(17, 0));
    }

    #[test]
    fn malformed_json_falls_back_to_default() {
        let schedule = WeeklySchedule::parse_or_default(Some("{not json"));
        assert_eq!(schedule, WeeklySchedule::default());

        let schedule = WeeklySchedule::parse_or_default(Some("[1, 2, 3]"));
        assert_eq!(schedule, WeeklySchedule::default());
    }

    #[test]
    fn bad_time_string_falls_back_to_default() {
        let raw = r#"{"Mon": {"enabled": true, "start": "late", "end": "17:00"}}"#;
        let schedule = WeeklySchedule::parse_or_default(Some(raw));
        assert_eq!(schedule, WeeklySchedule::default());
    }

    #[test]
    fn days_absent_from_stored_schedule_are_disabled() {
        let raw = r#"{"Mon": {"enabled": true, "start": "09:00", "end": "11:00"}}"#;
        let schedule = WeeklySchedule::parse_or_default(Some(raw));

        assert!(schedule.day(WeekdayTag::Mon).enabled);
        assert_eq!(schedule.day(WeekdayTag::Mon).end, t(11, 0));
        for day in [WeekdayTag::Tue, WeekdayTag::Wed, WeekdayTag::Sat] {
            assert!(!schedule.day(day).enabled);
        }
    }

    #[test]
    fn full_day_names_are_accepted_on_read() {
        let raw = r#"{"Monday": {"enabled": true, "start": "10:00", "end": "12:00"}}"#;
        let schedule = WeeklySchedule::parse_or_default(Some(raw));

        assert!(schedule.day(WeekdayTag::Mon).enabled);
        assert_eq!(schedule.day(WeekdayTag::Mon).start, t(10, 0));
    }

    #[test]
    fn missing_times_use_working_day_defaults() {
        let raw = r#"{"Tue": {"enabled": true}}"#;
        let schedule = WeeklySchedule::parse_or_default(Some(raw));

        let tue = schedule.day(WeekdayTag::Tue);
        assert!(tue.enabled);
        assert_eq!(tue.start, t(9, 0));
        assert_eq!(tue.end, t(17, 0));
    }

    #[test]
    fn strict_parse_rejects_unknown_day() {
        let value = serde_json::json!({"Funday": {"enabled": true, "start": "09:00", "end": "17:00"}});
        assert!(matches!(
            WeeklySchedule::from_value(&value),
            Err(ScheduleError::UnknownDay(_))
        ));
    }

    #[test]
    fn strict_parse_rejects_empty_range_on_enabled_day() {
        let value = serde_json::json!({"Mon": {"enabled": true, "start": "17:00", "end": "09:00"}});
        assert!(matches!(
            WeeklySchedule::from_value(&value),
            Err(ScheduleError::EmptyRange("Mon"))
        ));
    }

    #[test]
    fn strict_parse_requires_enabled_flag() {
        let value = serde_json::json!({"Mon": {"start": "09:00", "end": "17:00"}});
        assert!(matches!(
            WeeklySchedule::from_value(&value),
            Err(ScheduleError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn storage_round_trip_is_stable() {
        let value = serde_json::json!({"Mon": {"enabled": true, "start": "08:30", "end": "12:00"}});
        let schedule = WeeklySchedule::from_value(&value).unwrap();
        let stored = schedule.to_storage_json();

        let reread = WeeklySchedule::parse_or_default(Some(&stored));
        assert_eq!(reread, schedule);
    }

    #[test]
    fn weekday_tag_from_date_is_locale_independent() {
        // 2025-03-03 is a Monday.
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(WeekdayTag::from_date(date), WeekdayTag::Mon);

        let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(WeekdayTag::from_date(sunday), WeekdayTag::Sun);
    }
}
