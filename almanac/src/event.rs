use std::fmt;
use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarRegistry;
use crate::error::CalendarError;
use crate::policy::{apply_type_policy, EventType};
use crate::time::{Timestamp, TimeRepresentation};

/// Which of an event's two activities is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channel {
    Event,
    Reminder,
}

impl Channel {
    pub fn from_is_reminder(is_reminder: bool) -> Self {
        if is_reminder {
            Channel::Reminder
        } else {
            Channel::Event
        }
    }

    pub fn is_reminder(self) -> bool {
        self == Channel::Reminder
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Event => f.write_str("event"),
            Channel::Reminder => f.write_str("reminder"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgramLaunch {
    pub path: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub args: Vec<String>,
}

/// Side effects requested when an event or reminder fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Activity {
    pub notification: Option<String>,
    pub sound: Option<String>,
    pub program: Option<ProgramLaunch>,
}

impl Activity {
    pub fn is_empty(&self) -> bool {
        self.notification.is_none() && self.sound.is_none() && self.program.is_none()
    }
}

/// Reminder configuration. An offset of zero disables the reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reminder {
    pub offset: u64,
    pub before_event: bool,
}

impl Reminder {
    pub const DISABLED: Reminder = Reminder {
        offset: 0,
        before_event: true,
    };

    pub fn before(offset: u64) -> Self {
        Self {
            offset,
            before_event: true,
        }
    }

    pub fn after(offset: u64) -> Self {
        Self {
            offset,
            before_event: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.offset != 0
    }
}

impl Default for Reminder {
    fn default() -> Self {
        Self::DISABLED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Category {
    pub name: String,
    pub color: [u8; 3],
}

/// A persisted calendar event.
///
/// The scheduling attributes (`next_occurrence`, `next_reminder` and the
/// fired flags) are derived and only change through
/// [`EventRecord::refresh_schedule`], the scheduler's firing, or a snooze.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventRecord {
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub note: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub activity: Activity,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reminder_activity: Activity,

    start: TimeRepresentation,
    duration: u64,
    event_type: EventType,
    whole_day: bool,
    reminder: Reminder,

    next_occurrence: Option<Timestamp>,
    next_reminder: Option<Timestamp>,
    event_activity_fired: bool,
    reminder_activity_fired: bool,
    activity_snoozed_time: Option<Timestamp>,
    reminder_snoozed_time: Option<Timestamp>,

    #[cfg_attr(feature = "serde", serde(skip))]
    rearm_event: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    rearm_reminder: bool,
}

impl EventRecord {
    pub fn new<S: Into<String>>(name: S, start: TimeRepresentation, event_type: EventType) -> Self {
        let mut record = Self {
            name: name.into(),
            category: None,
            location: None,
            note: None,
            activity: Activity::default(),
            reminder_activity: Activity::default(),
            start,
            duration: 0,
            event_type,
            whole_day: false,
            reminder: Reminder::DISABLED,
            next_occurrence: None,
            next_reminder: None,
            event_activity_fired: false,
            reminder_activity_fired: false,
            activity_snoozed_time: None,
            reminder_snoozed_time: None,
            rearm_event: false,
            rearm_reminder: false,
        };
        record.apply_policy();
        record
    }

    #[must_use]
    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.set_duration(seconds);
        self
    }

    #[must_use]
    pub fn with_reminder(mut self, reminder: Reminder) -> Self {
        self.set_reminder(reminder);
        self
    }

    #[must_use]
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    #[must_use]
    pub fn with_reminder_activity(mut self, activity: Activity) -> Self {
        self.reminder_activity = activity;
        self
    }

    #[must_use]
    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn start(&self) -> &TimeRepresentation {
        &self.start
    }

    /// Moves the event and drops the snoozes of both channels.
    pub fn set_start(&mut self, start: TimeRepresentation) {
        self.start = start;
        self.activity_snoozed_time = None;
        self.reminder_snoozed_time = None;
        self.apply_policy();
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn set_duration(&mut self, seconds: u64) {
        self.duration = seconds;
        self.apply_policy();
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.apply_policy();
    }

    pub fn whole_day(&self) -> bool {
        self.whole_day
    }

    pub fn reminder(&self) -> Reminder {
        self.reminder
    }

    pub fn set_reminder(&mut self, reminder: Reminder) {
        self.reminder = reminder;
        self.reminder_snoozed_time = None;
    }

    /// Visible next occurrence: the snoozed time if one is set, otherwise
    /// the start. `None` until the record has been scheduled once.
    pub fn next_occurrence(&self) -> Option<Timestamp> {
        self.next_occurrence
    }

    /// Visible next reminder. Always `None` for a disabled reminder.
    pub fn next_reminder(&self) -> Option<Timestamp> {
        self.next_reminder
    }

    pub fn event_activity_fired(&self) -> bool {
        self.event_activity_fired
    }

    pub fn reminder_activity_fired(&self) -> bool {
        self.reminder_activity_fired
    }

    pub fn activity_snoozed_time(&self) -> Option<Timestamp> {
        self.activity_snoozed_time
    }

    pub fn reminder_snoozed_time(&self) -> Option<Timestamp> {
        self.reminder_snoozed_time
    }

    pub fn fired(&self, channel: Channel) -> bool {
        match channel {
            Channel::Event => self.event_activity_fired,
            Channel::Reminder => self.reminder_activity_fired,
        }
    }

    pub fn activity_for(&self, channel: Channel) -> &Activity {
        match channel {
            Channel::Event => &self.activity,
            Channel::Reminder => &self.reminder_activity,
        }
    }

    /// Whether the channel's activity should fire at `now`.
    pub fn is_due(&self, channel: Channel, now: Timestamp) -> bool {
        match channel {
            Channel::Event => {
                !self.event_activity_fired && self.next_occurrence.is_some_and(|at| at <= now)
            }
            Channel::Reminder => {
                self.reminder.is_enabled()
                    && !self.reminder_activity_fired
                    && self.next_reminder.is_some_and(|at| at <= now)
            }
        }
    }

    pub fn mark_fired(&mut self, channel: Channel) {
        match channel {
            Channel::Event => self.event_activity_fired = true,
            Channel::Reminder => self.reminder_activity_fired = true,
        }
    }

    /// Overrides the next fire time of one channel and re-arms it.
    /// Returns `false`, changing nothing, when snoozing a disabled reminder.
    pub fn snooze(&mut self, channel: Channel, until: Timestamp) -> bool {
        match channel {
            Channel::Event => {
                self.activity_snoozed_time = Some(until);
                self.event_activity_fired = false;
                self.rearm_event = true;
            }
            Channel::Reminder => {
                if !self.reminder.is_enabled() {
                    return false;
                }
                self.reminder_snoozed_time = Some(until);
                self.reminder_activity_fired = false;
                self.rearm_reminder = true;
            }
        }
        true
    }

    /// Requests that the next [`EventRecord::refresh_schedule`] leaves both
    /// activities armed, even if their times already passed.
    pub fn rearm(&mut self) {
        self.event_activity_fired = false;
        self.reminder_activity_fired = false;
        self.rearm_event = true;
        self.rearm_reminder = true;
    }

    /// Recomputes the derived scheduling attributes. Must run before every
    /// save.
    ///
    /// Snoozed times replace the natural ones so that stores can select due
    /// records with plain comparisons. When a visible time changes, its fired
    /// flag is reset to whether that time already passed, so a stale past
    /// event does not fire just because it was saved again.
    pub fn refresh_schedule(
        &mut self,
        registry: &CalendarRegistry,
        now: Timestamp,
    ) -> Result<(), CalendarError> {
        let natural = registry.to_absolute(&self.start)?;

        let next_occurrence = self.activity_snoozed_time.unwrap_or(natural);
        let next_reminder = if self.reminder.is_enabled() {
            let offset = i64::try_from(self.reminder.offset).unwrap_or(i64::MAX);
            let reminder = if self.reminder.before_event {
                natural - offset
            } else {
                natural + offset
            };
            Some(self.reminder_snoozed_time.unwrap_or(reminder))
        } else {
            None
        };

        if mem::take(&mut self.rearm_event) {
            self.event_activity_fired = false;
        } else if self.next_occurrence != Some(next_occurrence) {
            self.event_activity_fired = next_occurrence <= now;
        }

        let rearm_reminder = mem::take(&mut self.rearm_reminder);
        match next_reminder {
            None => self.reminder_activity_fired = true,
            Some(_) if rearm_reminder => self.reminder_activity_fired = false,
            Some(at) if self.next_reminder != next_reminder => {
                self.reminder_activity_fired = at <= now;
            }
            Some(_) => {}
        }

        self.next_occurrence = Some(next_occurrence);
        self.next_reminder = next_reminder;
        Ok(())
    }

    fn apply_policy(&mut self) {
        let shape = apply_type_policy(self.event_type, self.duration);
        self.duration = shape.duration;
        self.whole_day = shape.whole_day;
        if shape.whole_day && self.start.is_date {
            self.start = self.start.start_of_day();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::calendar::CalendarId;

    const HOUR: i64 = 3600;

    fn start() -> TimeRepresentation {
        // 2024-05-01 09:30:00 UTC
        TimeRepresentation::date(CalendarId::GREGORIAN, 2024, 5, 1, 9, 30, 0)
    }

    fn start_at() -> Timestamp {
        Timestamp(1_714_555_800)
    }

    #[test]
    fn refresh_computes_visible_times() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Dentist", start(), EventType::Appointment)
            .with_reminder(Reminder::before(15 * 60));

        record.refresh_schedule(&registry, start_at() - 2 * HOUR).unwrap();

        assert_eq!(record.next_occurrence(), Some(start_at()));
        assert_eq!(record.next_reminder(), Some(start_at() - 15 * 60));
        assert!(!record.event_activity_fired());
        assert!(!record.reminder_activity_fired());

        record.set_reminder(Reminder::after(600));
        record.refresh_schedule(&registry, start_at() - 2 * HOUR).unwrap();
        assert_eq!(record.next_reminder(), Some(start_at() + 600));
    }

    #[test]
    fn disabled_reminder_is_never_armed() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Standup", start(), EventType::Appointment);

        record.rearm();
        record.refresh_schedule(&registry, start_at() - HOUR).unwrap();

        assert_eq!(record.next_reminder(), None);
        assert!(record.reminder_activity_fired());
        assert!(!record.is_due(Channel::Reminder, start_at() + HOUR));
        assert!(!record.snooze(Channel::Reminder, start_at()));
        assert_eq!(record.reminder_snoozed_time(), None);
    }

    #[test]
    fn saving_a_past_event_marks_it_fired() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Yesterday", start(), EventType::Appointment)
            .with_reminder(Reminder::before(60));

        record.refresh_schedule(&registry, start_at() + 24 * HOUR).unwrap();

        assert!(record.event_activity_fired());
        assert!(record.reminder_activity_fired());
        assert!(!record.is_due(Channel::Event, start_at() + 24 * HOUR));
    }

    #[test]
    fn rearm_overrides_past_default() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Yesterday", start(), EventType::Appointment);

        record.refresh_schedule(&registry, start_at() + HOUR).unwrap();
        assert!(record.event_activity_fired());

        record.rearm();
        record.refresh_schedule(&registry, start_at() + HOUR).unwrap();
        assert!(record.is_due(Channel::Event, start_at() + HOUR));
    }

    #[test]
    fn unchanged_times_keep_fired_flags() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Review", start(), EventType::Appointment);

        record.refresh_schedule(&registry, start_at() - HOUR).unwrap();
        assert!(record.is_due(Channel::Event, start_at()));

        // A rename after the event became due must not swallow the firing.
        record.name = "Design review".into();
        record.refresh_schedule(&registry, start_at() + 60).unwrap();
        assert!(record.is_due(Channel::Event, start_at() + 60));

        record.mark_fired(Channel::Event);
        record.refresh_schedule(&registry, start_at() + 120).unwrap();
        assert!(record.event_activity_fired());
    }

    #[test]
    fn snooze_replaces_visible_time_and_rearms() {
        let registry = CalendarRegistry::default();
        let mut record = EventRecord::new("Call", start(), EventType::Appointment);
        record.refresh_schedule(&registry, start_at() - HOUR).unwrap();
        record.mark_fired(Channel::Event);

        let now = start_at() + 60;
        assert!(record.snooze(Channel::Event, now));
        record.refresh_schedule(&registry, now).unwrap();

        assert_eq!(record.activity_snoozed_time(), Some(now));
        assert_eq!(record.next_occurrence(), Some(now));
        assert!(record.is_due(Channel::Event, now));

        record.set_start(start());
        record.refresh_schedule(&registry, now).unwrap();
        assert_eq!(record.activity_snoozed_time(), None);
        assert_eq!(record.next_occurrence(), Some(start_at()));
    }

    #[test]
    fn whole_day_types_drop_time_of_day() {
        let record = EventRecord::new("Birthday", start(), EventType::Anniversary).with_duration(1);

        assert!(record.whole_day());
        assert_eq!(record.duration(), 86_400);
        assert_eq!((record.start().hour, record.start().minute), (0, 0));

        let mut note = record.clone();
        note.set_event_type(EventType::Note);
        assert_eq!(note.duration(), 0);
        assert!(!note.whole_day());
    }

    #[test]
    fn unknown_calendar_fails_refresh() {
        let registry = CalendarRegistry::default();
        let mut foreign = start();
        foreign.calendar = CalendarId::new("julian");
        let mut record = EventRecord::new("Feast", foreign, EventType::Holiday);

        assert_eq!(
            record.refresh_schedule(&registry, start_at()),
            Err(CalendarError::UnknownCalendar(CalendarId::new("julian")))
        );
        assert_eq!(record.next_occurrence(), None);
    }
}
