use std::ops::RangeInclusive;

use chrono::{
    DateTime, Datelike, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, Offset,
    TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

use crate::calendar::{CalendarId, CalendarModule, Name};
use crate::error::CalendarError;
use crate::time::{Timestamp, TimeRepresentation, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

const MONTHS: [Name; 12] = [
    Name { full: "January", short: "Jan" },
    Name { full: "February", short: "Feb" },
    Name { full: "March", short: "Mar" },
    Name { full: "April", short: "Apr" },
    Name { full: "May", short: "May" },
    Name { full: "June", short: "Jun" },
    Name { full: "July", short: "Jul" },
    Name { full: "August", short: "Aug" },
    Name { full: "September", short: "Sep" },
    Name { full: "October", short: "Oct" },
    Name { full: "November", short: "Nov" },
    Name { full: "December", short: "Dec" },
];

const WEEKDAYS: [Name; 7] = [
    Name { full: "Sunday", short: "Sun" },
    Name { full: "Monday", short: "Mon" },
    Name { full: "Tuesday", short: "Tue" },
    Name { full: "Wednesday", short: "Wed" },
    Name { full: "Thursday", short: "Thu" },
    Name { full: "Friday", short: "Fri" },
    Name { full: "Saturday", short: "Sat" },
];

const FIRST_YEAR: i32 = 1600;
const LAST_YEAR: i32 = 9999;

// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAY: i64 = 719_163;

/// Time zone that wall-clock field values are read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
    /// The system's local zone, looked up per date.
    Local,
}

impl Zone {
    /// Seconds east of UTC at a wall-clock time. Ambiguous times resolve to
    /// the earlier instant. Times skipped by a forward jump use the offset
    /// from before the jump.
    fn offset_at_local(&self, local: &NaiveDateTime) -> i32 {
        match self {
            Zone::Fixed(offset) => offset.local_minus_utc(),
            Zone::Named(tz) => resolve_local(tz, local),
            Zone::Local => resolve_local(&Local, local),
        }
    }

    fn offset_at_utc(&self, utc: &NaiveDateTime) -> i32 {
        match self {
            Zone::Fixed(offset) => offset.local_minus_utc(),
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix().local_minus_utc(),
            Zone::Local => Local.offset_from_utc_datetime(utc).fix().local_minus_utc(),
        }
    }
}

fn resolve_local<Z: TimeZone>(zone: &Z, local: &NaiveDateTime) -> i32 {
    match zone.offset_from_local_datetime(local) {
        LocalResult::Single(offset) | LocalResult::Ambiguous(offset, _) => {
            offset.fix().local_minus_utc()
        }
        LocalResult::None => {
            let before = local
                .checked_sub_signed(TimeDelta::days(1))
                .unwrap_or(*local);
            zone.offset_from_utc_datetime(&before).fix().local_minus_utc()
        }
    }
}

fn naive_at(seconds: i64) -> Result<NaiveDateTime, CalendarError> {
    DateTime::from_timestamp(seconds, 0)
        .map(|datetime| datetime.naive_utc())
        .ok_or(CalendarError::TimestampOutOfRange(seconds))
}

/// The proleptic Gregorian calendar. Field values are wall-clock values in
/// the module's [`Zone`]. Weekday 0 is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GregorianCalendar {
    zone: Zone,
}

impl GregorianCalendar {
    pub fn utc() -> Self {
        Self::with_offset(Utc.fix())
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    pub fn with_zone(tz: Tz) -> Self {
        Self {
            zone: Zone::Named(tz),
        }
    }

    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn is_leap_year(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    fn naive_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, CalendarError> {
        NaiveDate::from_ymd_opt(year, month, day).ok_or(CalendarError::InvalidDate {
            field: "day",
            value: i64::from(day),
        })
    }

    fn check_year(&self, year: i32) -> Result<(), CalendarError> {
        if self.legal_years().contains(&year) {
            Ok(())
        } else {
            Err(CalendarError::YearOutOfRange {
                year,
                min: FIRST_YEAR,
                max: LAST_YEAR,
            })
        }
    }
}

impl Default for GregorianCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl CalendarModule for GregorianCalendar {
    fn id(&self) -> CalendarId {
        CalendarId::GREGORIAN
    }

    fn days_in_week(&self) -> u32 {
        7
    }

    fn longest_month(&self) -> u32 {
        31
    }

    fn default_weekends(&self) -> Vec<u32> {
        vec![0, 6]
    }

    fn default_first_day_of_week(&self) -> u32 {
        1
    }

    fn legal_years(&self) -> RangeInclusive<i32> {
        FIRST_YEAR..=LAST_YEAR
    }

    fn months_in_year(&self, _year: i32) -> u32 {
        12
    }

    fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if Self::is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }

    fn month_names(&self, _year: i32) -> Vec<Name> {
        MONTHS.to_vec()
    }

    fn weekday_names(&self) -> Vec<Name> {
        WEEKDAYS.to_vec()
    }

    fn day_number(&self, year: i32, month: u32, day: u32) -> Result<i64, CalendarError> {
        Ok(i64::from(Self::naive_date(year, month, day)?.num_days_from_ce()))
    }

    fn weekday_of(&self, date: &TimeRepresentation) -> Result<u32, CalendarError> {
        if !(1..=12).contains(&date.month) {
            return Err(CalendarError::InvalidDate {
                field: "month",
                value: i64::from(date.month),
            });
        }
        let day = u32::try_from(date.day).map_err(|_| CalendarError::InvalidDate {
            field: "day",
            value: i64::from(date.day),
        })?;

        Ok(Self::naive_date(date.year, date.month as u32, day)?
            .weekday()
            .num_days_from_sunday())
    }

    fn to_absolute(&self, time: &TimeRepresentation) -> Result<Timestamp, CalendarError> {
        if !time.is_date {
            return Err(CalendarError::NotADate);
        }
        self.validate(time)?;

        let midnight = (self.day_number(time.year, time.month as u32, time.day as u32)?
            - UNIX_EPOCH_DAY)
            * SECONDS_PER_DAY;

        let wall = midnight
            + i64::from(time.hour) * SECONDS_PER_HOUR
            + i64::from(time.minute) * SECONDS_PER_MINUTE
            + i64::from(time.second);

        // Signed time-of-day fields may push the wall clock out of range.
        let local = naive_at(wall)?;
        self.check_year(local.year())?;

        Ok(Timestamp(wall - i64::from(self.zone.offset_at_local(&local))))
    }

    fn from_absolute(&self, at: Timestamp) -> Result<TimeRepresentation, CalendarError> {
        let offset = self.zone.offset_at_utc(&naive_at(at.seconds())?);
        let local = naive_at(at.seconds() + i64::from(offset))?;
        self.check_year(local.year())?;

        Ok(TimeRepresentation {
            year: local.year(),
            month: local.month() as i32,
            day: local.day() as i32,
            hour: local.hour() as i32,
            minute: local.minute() as i32,
            second: local.second() as i32,
            weekday: local.weekday().num_days_from_sunday(),
            day_of_year: local.ordinal(),
            is_date: true,
            calendar: self.id(),
        })
    }
}
