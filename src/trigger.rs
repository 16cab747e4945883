use std::{ops::RangeInclusive, time::Duration};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::Error;

/// Interval used in place of a calendar trigger that has no future match
pub const PAST_CALENDAR_FALLBACK: Duration = Duration::from_secs(1);

/// Years scanned when the year component is left open.
/// Eight covers the longest gap between two February 29ths.
const YEAR_SEARCH_HORIZON: i32 = 8;

/// Condition under which a pending notification fires. Never repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Fires once after the given delay
    Interval(Duration),
    /// Fires once at the next moment matching the components
    Calendar(CalendarMatch),
}

impl Trigger {
    pub fn after(delay: Duration) -> Self {
        Trigger::Interval(delay)
    }

    /// Build an interval trigger from fractional seconds
    pub fn after_secs(seconds: f64) -> Result<Self, Error> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(Error::InvalidTrigger(format!(
                "interval must be a positive number of seconds, got {seconds}"
            )));
        }
        let delay = Duration::try_from_secs_f64(seconds)
            .map_err(|err| Error::InvalidTrigger(err.to_string()))?;
        Ok(Trigger::Interval(delay))
    }

    pub fn at(components: CalendarMatch) -> Self {
        Trigger::Calendar(components)
    }

    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Trigger::Interval(delay) if delay.is_zero() => Err(Error::InvalidTrigger(
                "interval must be a positive number of seconds, got 0".to_owned(),
            )),
            Trigger::Interval(_) => Ok(()),
            Trigger::Calendar(components) => components.validate(),
        }
    }

    /// Validate the trigger and settle what happens when it can no longer match.
    ///
    /// A calendar trigger whose components only match moments at or before `now`
    /// becomes a [`PAST_CALENDAR_FALLBACK`] interval, so it fires right away
    /// instead of being left to platform-specific behaviour.
    pub fn resolve(self, now: NaiveDateTime) -> Result<Self, Error> {
        self.validate()?;
        match self {
            Trigger::Calendar(components) if components.next_match_after(now).is_none() => {
                log::warn!(
                    "calendar trigger {components:?} has no match after {now}, firing immediately"
                );
                Ok(Trigger::Interval(PAST_CALENDAR_FALLBACK))
            }
            trigger => Ok(trigger),
        }
    }

    /// Moment this trigger fires if it was scheduled at `now`
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Trigger::Interval(delay) => {
                let delay = chrono::Duration::from_std(*delay).ok()?;
                now.checked_add_signed(delay)
            }
            Trigger::Calendar(components) => components.next_match_after(now),
        }
    }
}

/// Date and time components a calendar trigger matches against.
///
/// Components left as `None` match any value. Seconds are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarMatch {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl CalendarMatch {
    pub fn new() -> Self {
        CalendarMatch::default()
    }

    /// Pin every component to the given moment, truncated to the minute
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        CalendarMatch {
            year: Some(at.year()),
            month: Some(at.month()),
            day: Some(at.day()),
            hour: Some(at.hour()),
            minute: Some(at.minute()),
        }
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn hour(mut self, hour: u32) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn minute(mut self, minute: u32) -> Self {
        self.minute = Some(minute);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == CalendarMatch::default()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::InvalidTrigger(
                "calendar trigger needs at least one date component".to_owned(),
            ));
        }
        if let Some(year) = self.year {
            if !(1..=9999).contains(&year) {
                return Err(Error::InvalidTrigger(format!("year {year} out of range")));
            }
        }
        check_component("month", self.month, 1..=12)?;
        check_component("day", self.day, 1..=31)?;
        check_component("hour", self.hour, 0..=23)?;
        check_component("minute", self.minute, 0..=59)?;
        Ok(())
    }

    /// First moment strictly after `now` matching every set component
    pub fn next_match_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today = now.date();
        let years = match self.year {
            Some(year) if year < now.year() => return None,
            Some(year) => year..=year,
            None => now.year()..=now.year() + YEAR_SEARCH_HORIZON,
        };

        for year in years {
            for month in candidates(self.month, 1..=12) {
                if (year, month) < (now.year(), now.month()) {
                    continue;
                }
                for day in candidates(self.day, 1..=31) {
                    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                        continue;
                    };
                    if date < today {
                        continue;
                    }
                    for hour in candidates(self.hour, 0..=23) {
                        if date == today && hour < now.hour() {
                            continue;
                        }
                        for minute in candidates(self.minute, 0..=59) {
                            let Some(candidate) = date.and_hms_opt(hour, minute, 0) else {
                                continue;
                            };
                            if candidate > now {
                                return Some(candidate);
                            }
                        }
                    }
                }
            }
        }

        None
    }
}

fn check_component(
    name: &str,
    value: Option<u32>,
    range: RangeInclusive<u32>,
) -> Result<(), Error> {
    match value {
        Some(value) if !range.contains(&value) => Err(Error::InvalidTrigger(format!(
            "{name} {value} outside {}..={}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}

fn candidates(fixed: Option<u32>, all: RangeInclusive<u32>) -> RangeInclusive<u32> {
    match fixed {
        Some(value) => value..=value,
        None => all,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn interval_must_be_positive() {
        assert!(matches!(Trigger::after_secs(0.0), Err(Error::InvalidTrigger(_))));
        assert!(matches!(Trigger::after_secs(-3.0), Err(Error::InvalidTrigger(_))));
        assert!(matches!(Trigger::after_secs(f64::NAN), Err(Error::InvalidTrigger(_))));
        assert!(Trigger::after(Duration::ZERO).validate().is_err());

        let trigger = Trigger::after_secs(10.0).unwrap();
        assert_eq!(trigger, Trigger::Interval(Duration::from_secs(10)));
    }

    #[test]
    fn interval_outside_ui_range_is_still_valid() {
        assert!(Trigger::after(Duration::from_secs(3600)).validate().is_ok());
        assert!(Trigger::after_secs(0.25).is_ok());
    }

    #[test]
    fn daily_time_rolls_to_next_day() {
        let now = at(2026, 10, 19, 9, 0, 0);
        let components = CalendarMatch::new().hour(8).minute(30);
        assert_eq!(
            components.next_match_after(now),
            Some(at(2026, 10, 20, 8, 30, 0))
        );
    }

    #[test]
    fn later_today_matches_today() {
        let now = at(2026, 10, 19, 9, 0, 0);
        let components = CalendarMatch::new().hour(10).minute(0);
        assert_eq!(
            components.next_match_after(now),
            Some(at(2026, 10, 19, 10, 0, 0))
        );
    }

    #[test]
    fn match_is_strictly_after_now() {
        let now = at(2026, 10, 19, 8, 30, 0);
        let components = CalendarMatch::new().hour(8).minute(30);
        assert_eq!(
            components.next_match_after(now),
            Some(at(2026, 10, 20, 8, 30, 0))
        );
    }

    #[test]
    fn open_minute_matches_next_minute_of_current_hour() {
        let now = at(2026, 10, 19, 8, 15, 30);
        let components = CalendarMatch::new().hour(8);
        assert_eq!(
            components.next_match_after(now),
            Some(at(2026, 10, 19, 8, 16, 0))
        );
    }

    #[test]
    fn leap_day_skips_to_next_leap_year() {
        let now = at(2026, 3, 1, 0, 0, 0);
        let components = CalendarMatch::new().month(2).day(29).hour(0).minute(0);
        assert_eq!(
            components.next_match_after(now),
            Some(at(2028, 2, 29, 0, 0, 0))
        );
    }

    #[test]
    fn impossible_date_never_matches() {
        let now = at(2026, 1, 1, 0, 0, 0);
        let components = CalendarMatch::new().month(2).day(30);
        assert!(components.validate().is_ok());
        assert_eq!(components.next_match_after(now), None);
    }

    #[test]
    fn past_pinned_date_falls_back_to_immediate_interval() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let past = CalendarMatch::from_datetime(at(2024, 11, 8, 9, 0, 0));
        assert_eq!(past.next_match_after(now), None);

        let resolved = Trigger::at(past).resolve(now).unwrap();
        assert_eq!(resolved, Trigger::Interval(PAST_CALENDAR_FALLBACK));
    }

    #[test]
    fn future_calendar_trigger_is_kept() {
        let now = at(2026, 10, 19, 12, 0, 0);
        let components = CalendarMatch::new().year(2027).month(1).day(1).hour(0).minute(0);
        let resolved = Trigger::at(components).resolve(now).unwrap();
        assert_eq!(resolved, Trigger::Calendar(components));
        assert_eq!(
            resolved.next_fire_after(now),
            Some(at(2027, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        let now = at(2026, 10, 19, 12, 0, 0);
        for components in [
            CalendarMatch::new().month(13),
            CalendarMatch::new().day(0),
            CalendarMatch::new().hour(24),
            CalendarMatch::new().minute(60),
            CalendarMatch::new(),
        ] {
            assert!(matches!(
                Trigger::at(components).resolve(now),
                Err(Error::InvalidTrigger(_))
            ));
        }
    }
}
