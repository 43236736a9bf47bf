//! Calendar engine and reminder scheduler.
//!
//! Dates are kept as calendar-agnostic [`TimeRepresentation`]s tagged with
//! the [`CalendarModule`] that owns them. Event records carry the derived
//! scheduling attributes an [`EventStore`] indexes, and the [`Scheduler`]
//! polls the store and fires each due event and reminder at most once.

pub mod calendar;
pub mod error;
pub mod event;
pub mod policy;
pub mod scheduler;
pub mod store;
pub mod time;

#[cfg(feature = "ics")]
mod ics;

pub use calendar::{CalendarId, CalendarModule, CalendarRegistry, GregorianCalendar, Zone};
pub use error::{CalendarError, Error, Result, StoreError};
pub use event::{Activity, Category, Channel, EventRecord, ProgramLaunch, Reminder};
pub use policy::{apply_type_policy, DurationShape, EventType};
pub use scheduler::{
    ActivityEffect, ActivityWindow, Clock, Firing, ManualClock, ScanReport, Scheduler,
    SchedulerConfig, SnoozePrompt, SnoozeRequest, SnoozeSender, SystemClock,
};
pub use store::{EventStore, MemoryStore, Predicate, RecordRef};
pub use time::{TimeRepresentation, Timestamp};

#[cfg(feature = "ics")]
pub use self::ics::to_ics_calendar;
