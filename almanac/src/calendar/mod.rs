//! Pluggable calendar arithmetic.
//!
//! A [`CalendarModule`] converts between [`TimeRepresentation`] fields and the
//! absolute time axis for one calendar system. Calendars only differ in their
//! month tables, names, weekday origin and epoch, so carry propagation,
//! validation and date differences are provided here in terms of those
//! primitives.

mod gregorian;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use once_cell::sync::Lazy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::time::{Timestamp, TimeRepresentation};

pub use gregorian::{GregorianCalendar, Zone};

/// Tag identifying the calendar module that owns a [`TimeRepresentation`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct CalendarId(Cow<'static, str>);

impl CalendarId {
    pub const GREGORIAN: CalendarId = CalendarId(Cow::Borrowed("gregorian"));

    pub fn new<S: Into<Cow<'static, str>>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name {
    pub full: &'static str,
    pub short: &'static str,
}

pub trait CalendarModule: Send + Sync + fmt::Debug {
    fn id(&self) -> CalendarId;

    fn days_in_week(&self) -> u32;

    fn longest_month(&self) -> u32;

    /// Weekday indices (into [`CalendarModule::weekday_names`]) that are
    /// weekend days unless the user says otherwise.
    fn default_weekends(&self) -> Vec<u32>;

    fn default_first_day_of_week(&self) -> u32;

    /// Years for which absolute time conversion is defined.
    fn legal_years(&self) -> RangeInclusive<i32>;

    fn months_in_year(&self, year: i32) -> u32;

    fn days_in_month(&self, year: i32, month: u32) -> u32;

    fn month_names(&self, year: i32) -> Vec<Name>;

    fn weekday_names(&self) -> Vec<Name>;

    /// Labels for every day of the given month.
    fn day_labels(&self, year: i32, month: u32) -> Vec<String> {
        (1..=self.days_in_month(year, month))
            .map(|day| day.to_string())
            .collect()
    }

    /// Number of days between the module's epoch and the given date.
    fn day_number(&self, year: i32, month: u32, day: u32) -> Result<i64, CalendarError>;

    fn weekday_of(&self, date: &TimeRepresentation) -> Result<u32, CalendarError>;

    fn to_absolute(&self, time: &TimeRepresentation) -> Result<Timestamp, CalendarError>;

    /// Fields for an absolute time, with weekday and day of year filled in.
    fn from_absolute(&self, at: Timestamp) -> Result<TimeRepresentation, CalendarError>;

    fn day_of_year(&self, year: i32, month: u32, day: u32) -> u32 {
        (1..month).map(|m| self.days_in_month(year, m)).sum::<u32>() + day
    }

    /// Rejects dates whose fields are outside their legal ranges. Durations
    /// are never rejected.
    fn validate(&self, time: &TimeRepresentation) -> Result<(), CalendarError> {
        ensure_owned(self, time)?;

        if !time.is_date {
            return Ok(());
        }

        let years = self.legal_years();
        if !years.contains(&time.year) {
            return Err(CalendarError::YearOutOfRange {
                year: time.year,
                min: *years.start(),
                max: *years.end(),
            });
        }

        let months = self.months_in_year(time.year) as i32;
        check_range("month", time.month, 1..=months)?;

        let days = self.days_in_month(time.year, time.month as u32) as i32;
        check_range("day", time.day, 1..=days)?;

        check_range("hour", time.hour, -24..=24)?;
        check_range("minute", time.minute, -59..=59)?;
        check_range("second", time.second, -59..=59)
    }

    /// Carries overflowing fields upward: seconds, minutes, hours, days,
    /// months, years. Month lengths are taken from the year reached so far.
    /// Weekday and day of year are re-derived for dates.
    ///
    /// Durations carry their time of day into days and their months into
    /// years; days are never folded into months.
    fn normalize(&self, time: &TimeRepresentation) -> Result<TimeRepresentation, CalendarError> {
        ensure_owned(self, time)?;

        let second = i64::from(time.second);
        let minute = i64::from(time.minute) + second.div_euclid(60);
        let hour = i64::from(time.hour) + minute.div_euclid(60);
        let mut day = i64::from(time.day) + hour.div_euclid(24);
        let mut month = i64::from(time.month);
        let mut year = i64::from(time.year);

        let mut normalized = time.clone();
        normalized.second = second.rem_euclid(60) as i32;
        normalized.minute = minute.rem_euclid(60) as i32;
        normalized.hour = hour.rem_euclid(24) as i32;

        if !time.is_date {
            let per_year = i64::from(self.months_in_year(time.year));
            year += month.div_euclid(per_year);
            month = month.rem_euclid(per_year);

            normalized.year = narrow("year", year)?;
            normalized.month = month as i32;
            normalized.day = narrow("day", day)?;
            normalized.weekday = 0;
            normalized.day_of_year = 0;
            return Ok(normalized);
        }

        // Jump whole years at the starting year's month count; the loops
        // below settle calendars whose month count varies.
        let per_year = i64::from(self.months_in_year(time.year)).max(1);
        let years = (month - 1).div_euclid(per_year);
        year += years;
        month -= years * per_year;

        while month > i64::from(self.months_in_year(narrow("year", year)?)) {
            month -= i64::from(self.months_in_year(narrow("year", year)?));
            year += 1;
        }
        while month < 1 {
            year -= 1;
            month += i64::from(self.months_in_year(narrow("year", year)?));
        }

        loop {
            let y = narrow("year", year)?;
            let length = i64::from(self.days_in_month(y, month as u32));
            if day <= length {
                break;
            }
            day -= length;
            month += 1;
            if month > i64::from(self.months_in_year(y)) {
                month = 1;
                year += 1;
            }
        }
        while day < 1 {
            month -= 1;
            if month < 1 {
                year -= 1;
                month = i64::from(self.months_in_year(narrow("year", year)?));
            }
            day += i64::from(self.days_in_month(narrow("year", year)?, month as u32));
        }

        normalized.year = narrow("year", year)?;
        normalized.month = month as i32;
        normalized.day = day as i32;
        normalized.day_of_year =
            self.day_of_year(normalized.year, normalized.month as u32, normalized.day as u32);
        normalized.weekday = self.weekday_of(&normalized)?;

        Ok(normalized)
    }

    /// Non-negative field-wise delta between two dates, regardless of
    /// argument order. Adding the result to the earlier date yields the
    /// later one.
    ///
    /// With `days_only`, time of day is ignored and the result holds the
    /// number of calendar days between the two dates in its `day` field.
    fn difference(
        &self,
        a: &TimeRepresentation,
        b: &TimeRepresentation,
        days_only: bool,
    ) -> Result<TimeRepresentation, CalendarError> {
        ensure_owned(self, a)?;
        ensure_owned(self, b)?;
        if !a.is_date || !b.is_date {
            return Err(CalendarError::NotADate);
        }

        let a = self.normalize(a)?;
        let b = self.normalize(b)?;
        let (low, high) = match a.cmp_chronological(&b) {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };

        if days_only {
            let days = self.day_number(high.year, high.month as u32, high.day as u32)?
                - self.day_number(low.year, low.month as u32, low.day as u32)?;
            return Ok(TimeRepresentation::duration(self.id(), narrow("day", days)?, 0, 0, 0));
        }

        let mut second = high.second - low.second;
        let mut minute = high.minute - low.minute;
        let mut hour = high.hour - low.hour;
        let mut day = high.day - low.day;
        let mut month = high.month - low.month;
        let mut year = high.year - low.year;

        if second < 0 {
            second += 60;
            minute -= 1;
        }
        if minute < 0 {
            minute += 60;
            hour -= 1;
        }
        if hour < 0 {
            hour += 24;
            day -= 1;
        }

        // Borrow whole months walking backwards from the later date.
        let (mut borrow_year, mut borrow_month) = (high.year, high.month);
        while day < 0 {
            borrow_month -= 1;
            if borrow_month < 1 {
                borrow_year -= 1;
                borrow_month = self.months_in_year(borrow_year) as i32;
            }
            day += self.days_in_month(borrow_year, borrow_month as u32) as i32;
            month -= 1;
        }
        while month < 0 {
            year -= 1;
            month += self.months_in_year(low.year) as i32;
        }

        Ok(TimeRepresentation {
            year,
            month,
            day,
            hour,
            minute,
            second,
            weekday: 0,
            day_of_year: 0,
            is_date: false,
            calendar: self.id(),
        })
    }
}

fn ensure_owned<M: CalendarModule + ?Sized>(
    module: &M,
    time: &TimeRepresentation,
) -> Result<(), CalendarError> {
    let id = module.id();
    if time.calendar == id {
        Ok(())
    } else {
        Err(CalendarError::CalendarMismatch {
            left: id,
            right: time.calendar.clone(),
        })
    }
}

fn check_range(
    field: &'static str,
    value: i32,
    range: RangeInclusive<i32>,
) -> Result<(), CalendarError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(CalendarError::InvalidDate {
            field,
            value: i64::from(value),
        })
    }
}

fn narrow(field: &'static str, value: i64) -> Result<i32, CalendarError> {
    i32::try_from(value).map_err(|_| CalendarError::InvalidDate { field, value })
}

/// Calendar modules by id. Lookups fail closed: an unknown id is an error,
/// never a fallback to Gregorian.
#[derive(Clone)]
pub struct CalendarRegistry {
    modules: HashMap<CalendarId, Arc<dyn CalendarModule>>,
}

impl CalendarRegistry {
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Shared registry holding the default Gregorian module (UTC).
    pub fn global() -> &'static CalendarRegistry {
        static GLOBAL: Lazy<CalendarRegistry> = Lazy::new(CalendarRegistry::default);
        &GLOBAL
    }

    #[must_use]
    pub fn with_module<M: CalendarModule + 'static>(mut self, module: M) -> Self {
        self.register(Arc::new(module));
        self
    }

    /// Registers a module, returning the one it replaced.
    pub fn register(&mut self, module: Arc<dyn CalendarModule>) -> Option<Arc<dyn CalendarModule>> {
        self.modules.insert(module.id(), module)
    }

    pub fn get(&self, id: &CalendarId) -> Result<Arc<dyn CalendarModule>, CalendarError> {
        self.modules
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| CalendarError::UnknownCalendar(id.clone()))
    }

    pub fn contains(&self, id: &CalendarId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn to_absolute(&self, time: &TimeRepresentation) -> Result<Timestamp, CalendarError> {
        self.get(&time.calendar)?.to_absolute(time)
    }

    pub fn from_absolute(
        &self,
        id: &CalendarId,
        at: Timestamp,
    ) -> Result<TimeRepresentation, CalendarError> {
        self.get(id)?.from_absolute(at)
    }
}

impl Default for CalendarRegistry {
    fn default() -> Self {
        Self::empty().with_module(GregorianCalendar::utc())
    }
}

impl fmt::Debug for CalendarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.modules.keys().collect::<Vec<_>>();
        ids.sort();
        f.debug_struct("CalendarRegistry").field("modules", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_fails_closed_for_unknown_calendars() {
        let registry = CalendarRegistry::default();
        let julian = CalendarId::new("julian");

        assert!(registry.contains(&CalendarId::GREGORIAN));
        assert_eq!(
            registry.get(&julian).unwrap_err(),
            CalendarError::UnknownCalendar(julian.clone())
        );

        let date = TimeRepresentation::date(julian, 2024, 1, 1, 0, 0, 0);
        assert!(matches!(
            registry.to_absolute(&date),
            Err(CalendarError::UnknownCalendar(_))
        ));
    }

    #[test]
    fn registering_replaces_existing_module() {
        let mut registry = CalendarRegistry::empty();
        assert!(registry.register(Arc::new(GregorianCalendar::utc())).is_none());
        assert!(registry.register(Arc::new(GregorianCalendar::utc())).is_some());
        assert!(CalendarRegistry::global().contains(&CalendarId::GREGORIAN));
    }

    #[test]
    fn modules_reject_foreign_values() {
        let gregorian = GregorianCalendar::utc();
        let foreign = TimeRepresentation::date(CalendarId::new("hebrew"), 5784, 1, 1, 0, 0, 0);

        assert!(matches!(
            gregorian.normalize(&foreign),
            Err(CalendarError::CalendarMismatch { .. })
        ));
    }
}
