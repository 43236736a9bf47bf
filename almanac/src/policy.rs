//! Rules coupling an event's type to the shape of its duration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::SECONDS_PER_DAY;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventType {
    #[default]
    Appointment,
    Anniversary,
    Holiday,
    Note,
}

impl EventType {
    pub fn is_whole_day(self) -> bool {
        matches!(self, EventType::Anniversary | EventType::Holiday)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationShape {
    pub duration: u64,
    pub whole_day: bool,
}

/// Fits a requested duration (in seconds) to what the event type allows.
///
/// Notes are instants. Anniversaries and holidays cover at least one day and
/// are rounded up to whole days, so 86400 seconds stays one day and 86401
/// becomes two. Appointments keep whatever they asked for.
pub fn apply_type_policy(event_type: EventType, requested: u64) -> DurationShape {
    match event_type {
        EventType::Note => DurationShape {
            duration: 0,
            whole_day: false,
        },
        EventType::Anniversary | EventType::Holiday => {
            let day = SECONDS_PER_DAY as u64;
            let days = requested.saturating_sub(1) / day + 1;
            DurationShape {
                // Past the largest representable day count, stay on it.
                duration: days.checked_mul(day).unwrap_or(u64::MAX / day * day),
                whole_day: true,
            }
        }
        EventType::Appointment => DurationShape {
            duration: requested,
            whole_day: false,
        },
    }
}
