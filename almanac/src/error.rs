use thiserror::Error;

use crate::calendar::CalendarId;
use crate::store::RecordRef;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the calendar engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid date: {field} = {value}")]
    InvalidDate { field: &'static str, value: i64 },

    #[error("year {year} is outside the legal range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("unknown calendar module `{0}`")]
    UnknownCalendar(CalendarId),

    #[error("expected a date, got a duration")]
    NotADate,

    #[error("timestamp {0} cannot be represented")]
    TimestampOutOfRange(i64),

    #[error("cannot combine `{left}` and `{right}` time representations")]
    CalendarMismatch { left: CalendarId, right: CalendarId },
}

/// Failures reported by an event store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordRef),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("store backend error: {0}")]
    Backend(String),
}
