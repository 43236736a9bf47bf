use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use chrono::Utc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarId, CalendarModule, CalendarRegistry};
use crate::error::CalendarError;

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// A point on the absolute time axis, in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub const fn seconds(self) -> i64 {
        self.0
    }
}

impl Add<i64> for Timestamp {
    type Output = Timestamp;

    fn add(self, seconds: i64) -> Timestamp {
        Timestamp(self.0.saturating_add(seconds))
    }
}

impl Sub<i64> for Timestamp {
    type Output = Timestamp;

    fn sub(self, seconds: i64) -> Timestamp {
        Timestamp(self.0.saturating_sub(seconds))
    }
}

impl Sub for Timestamp {
    type Output = i64;

    fn sub(self, other: Timestamp) -> i64 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Calendar-agnostic date/time fields tagged with the calendar module that
/// owns them.
///
/// The same shape is used for real dates (`is_date == true`) and for
/// durations/offsets. Fields are signed so that field-wise sums may overflow
/// their canonical range until the owning module normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeRepresentation {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub weekday: u32,
    pub day_of_year: u32,
    pub is_date: bool,
    pub calendar: CalendarId,
}

impl TimeRepresentation {
    /// Raw date fields. Weekday and day of year are only filled in once the
    /// value passes through [`CalendarModule::normalize`] or
    /// [`CalendarModule::from_absolute`].
    pub fn date(
        calendar: CalendarId,
        year: i32,
        month: i32,
        day: i32,
        hour: i32,
        minute: i32,
        second: i32,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday: 0,
            day_of_year: 0,
            is_date: true,
            calendar,
        }
    }

    pub fn duration(calendar: CalendarId, days: i32, hours: i32, minutes: i32, seconds: i32) -> Self {
        Self {
            year: 0,
            month: 0,
            day: days,
            hour: hours,
            minute: minutes,
            second: seconds,
            weekday: 0,
            day_of_year: 0,
            is_date: false,
            calendar,
        }
    }

    /// A duration of `seconds` split into days, hours, minutes and seconds.
    /// Every field carries the sign of the input.
    pub fn duration_from_seconds(calendar: CalendarId, seconds: i64) -> Result<Self, CalendarError> {
        let days = i32::try_from(seconds / SECONDS_PER_DAY)
            .map_err(|_| CalendarError::TimestampOutOfRange(seconds))?;
        let rest = seconds % SECONDS_PER_DAY;

        Ok(Self::duration(
            calendar,
            days,
            (rest / SECONDS_PER_HOUR) as i32,
            (rest % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as i32,
            (rest % SECONDS_PER_MINUTE) as i32,
        ))
    }

    /// Current wall-clock time in the given calendar.
    pub fn now(module: &dyn CalendarModule) -> Result<Self, CalendarError> {
        module.from_absolute(Timestamp::now())
    }

    /// Total length of a duration in seconds. `None` for dates and for
    /// durations with a month or year component, whose length depends on
    /// where they are applied.
    pub fn to_seconds(&self) -> Option<i64> {
        if self.is_date || self.year != 0 || self.month != 0 {
            return None;
        }

        Some(
            i64::from(self.day) * SECONDS_PER_DAY
                + i64::from(self.hour) * SECONDS_PER_HOUR
                + i64::from(self.minute) * SECONDS_PER_MINUTE
                + i64::from(self.second),
        )
    }

    pub fn same_calendar(&self, other: &TimeRepresentation) -> bool {
        self.calendar == other.calendar
    }

    /// Field-wise sum, normalized by the calendar module owning `self`.
    /// The result is a date if either operand is one.
    pub fn add(
        &self,
        other: &TimeRepresentation,
        registry: &CalendarRegistry,
    ) -> Result<TimeRepresentation, CalendarError> {
        self.ensure_same_calendar(other)?;
        let module = registry.get(&self.calendar)?;

        let sum = TimeRepresentation {
            year: self.year.saturating_add(other.year),
            month: self.month.saturating_add(other.month),
            day: self.day.saturating_add(other.day),
            hour: self.hour.saturating_add(other.hour),
            minute: self.minute.saturating_add(other.minute),
            second: self.second.saturating_add(other.second),
            weekday: 0,
            day_of_year: 0,
            is_date: self.is_date || other.is_date,
            calendar: self.calendar.clone(),
        };

        module.normalize(&sum)
    }

    /// The same date at 00:00:00.
    pub fn start_of_day(&self) -> TimeRepresentation {
        TimeRepresentation {
            hour: 0,
            minute: 0,
            second: 0,
            ..self.clone()
        }
    }

    /// Chronological ordering of two normalized values.
    ///
    /// # Panics
    ///
    /// Comparing values owned by different calendar modules is a programming
    /// error and panics. Use [`TimeRepresentation::try_cmp`] to get an error
    /// instead.
    pub fn cmp_chronological(&self, other: &TimeRepresentation) -> Ordering {
        assert!(
            self.same_calendar(other),
            "compared `{}` and `{}` time representations",
            self.calendar,
            other.calendar
        );
        self.fields().cmp(&other.fields())
    }

    pub fn try_cmp(&self, other: &TimeRepresentation) -> Result<Ordering, CalendarError> {
        self.ensure_same_calendar(other)?;
        Ok(self.fields().cmp(&other.fields()))
    }

    pub(crate) fn ensure_same_calendar(&self, other: &TimeRepresentation) -> Result<(), CalendarError> {
        if self.same_calendar(other) {
            Ok(())
        } else {
            Err(CalendarError::CalendarMismatch {
                left: self.calendar.clone(),
                right: other.calendar.clone(),
            })
        }
    }

    fn fields(&self) -> (i32, i32, i32, i32, i32, i32) {
        (self.year, self.month, self.day, self.hour, self.minute, self.second)
    }
}

impl fmt::Display for TimeRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_date {
            write!(
                f,
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            )
        } else {
            write!(
                f,
                "{}y {}m {}d {:02}:{:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gregorian_date(y: i32, m: i32, d: i32, h: i32, mi: i32, s: i32) -> TimeRepresentation {
        TimeRepresentation::date(CalendarId::GREGORIAN, y, m, d, h, mi, s)
    }

    #[test]
    fn duration_from_seconds_splits_fields() {
        let duration =
            TimeRepresentation::duration_from_seconds(CalendarId::GREGORIAN, 2 * SECONDS_PER_DAY + 3723)
                .unwrap();

        assert_eq!((duration.day, duration.hour, duration.minute, duration.second), (2, 1, 2, 3));
        assert!(!duration.is_date);
        assert_eq!(duration.to_seconds(), Some(2 * SECONDS_PER_DAY + 3723));
    }

    #[test]
    fn negative_duration_keeps_sign_in_every_field() {
        let duration = TimeRepresentation::duration_from_seconds(CalendarId::GREGORIAN, -3723).unwrap();
        assert_eq!((duration.hour, duration.minute, duration.second), (-1, -2, -3));
        assert_eq!(duration.to_seconds(), Some(-3723));
    }

    #[test]
    fn add_carries_into_next_year() {
        let registry = CalendarRegistry::default();
        let new_years_eve = gregorian_date(2023, 12, 31, 23, 30, 0);
        let hour = TimeRepresentation::duration(CalendarId::GREGORIAN, 0, 1, 0, 0);

        let sum = new_years_eve.add(&hour, &registry).unwrap();
        assert_eq!((sum.year, sum.month, sum.day, sum.hour, sum.minute), (2024, 1, 1, 0, 30));
        assert_eq!(sum.day_of_year, 1);
        assert!(sum.is_date);
    }

    #[test]
    fn add_rejects_foreign_calendar() {
        let registry = CalendarRegistry::default();
        let date = gregorian_date(2024, 1, 1, 0, 0, 0);
        let foreign = TimeRepresentation::duration(CalendarId::new("julian"), 1, 0, 0, 0);

        assert!(matches!(
            date.add(&foreign, &registry),
            Err(CalendarError::CalendarMismatch { .. })
        ));
    }

    #[test]
    fn chronological_order() {
        let earlier = gregorian_date(2024, 2, 28, 23, 59, 59);
        let later = gregorian_date(2024, 2, 29, 0, 0, 0);
        assert_eq!(earlier.cmp_chronological(&later), Ordering::Less);
        assert_eq!(later.try_cmp(&earlier), Ok(Ordering::Greater));
    }

    #[test]
    #[should_panic(expected = "compared `gregorian` and `julian`")]
    fn cross_calendar_comparison_panics() {
        let date = gregorian_date(2024, 1, 1, 0, 0, 0);
        let mut foreign = date.clone();
        foreign.calendar = CalendarId::new("julian");
        date.cmp_chronological(&foreign);
    }

    #[test]
    fn timestamp_arithmetic() {
        let at = Timestamp(1_000);
        assert_eq!(at + 600, Timestamp(1_600));
        assert_eq!(at - 1_000, Timestamp(0));
        assert_eq!(Timestamp(1_600) - at, 600);
    }
}
