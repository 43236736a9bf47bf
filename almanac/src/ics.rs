use chrono::DateTime;
use ics::components::{Parameter, Property};
use ics::properties::{Categories, Description, DtEnd, DtStart, Location, Summary, Trigger};
use ics::{Alarm, ICalendar};
use log::warn;

use crate::calendar::{CalendarId, CalendarRegistry};
use crate::error::CalendarError;
use crate::event::EventRecord;
use crate::store::RecordRef;
use crate::time::{Timestamp, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

impl EventRecord {
    /// Renders the record as a `VEVENT`. Timed events are written in UTC,
    /// whole-day events as `DATE` values on the Gregorian calendar.
    pub fn to_ics(
        &self,
        record: RecordRef,
        registry: &CalendarRegistry,
    ) -> Result<ics::Event<'_>, CalendarError> {
        let start = registry.to_absolute(self.start())?;
        let end = start + i64::try_from(self.duration()).unwrap_or(i64::MAX);

        let (dtstart, dtend) = if self.whole_day() {
            let mut dtstart = DtStart::new(gregorian_date(registry, start)?);
            dtstart.add(Parameter::new("VALUE", "DATE"));
            let mut dtend = DtEnd::new(gregorian_date(registry, end)?);
            dtend.add(Parameter::new("VALUE", "DATE"));
            (dtstart, dtend)
        } else {
            (DtStart::new(utc(start)?), DtEnd::new(utc(end)?))
        };

        let mut ics_event = ics::Event::new(format!("almanac-{}", record.0), utc(start)?);

        ics_event.push(dtstart);
        ics_event.push(dtend);
        ics_event.push(Summary::new(&self.name));

        if let Some(location) = &self.location {
            ics_event.push(Location::new(location));
        }

        if let Some(category) = &self.category {
            ics_event.push(Categories::new(category));
        }

        if let Some(note) = &self.note {
            ics_event.push(Description::new(note));
        }

        let reminder = self.reminder();
        if reminder.is_enabled() {
            let sign = if reminder.before_event { "-" } else { "" };
            let trigger = Trigger::new(format!("{sign}{}", ics_duration(reminder.offset)));
            let text = self
                .reminder_activity
                .notification
                .as_deref()
                .unwrap_or(&self.name);
            ics_event.add_alarm(Alarm::display(trigger, Description::new(text)));
        }

        Ok(ics_event)
    }
}

/// Assembles an iCalendar out of stored records. Records whose calendar
/// cannot be resolved are left out.
pub fn to_ics_calendar<'a, I>(name: &'a str, records: I, registry: &CalendarRegistry) -> ICalendar<'a>
where
    I: IntoIterator<Item = (RecordRef, &'a EventRecord)>,
{
    let mut icalendar = ICalendar::new("2.0", name);
    icalendar.push(Property::new("X-WR-CALNAME", name));

    for (record, event) in records {
        match event.to_ics(record, registry) {
            Ok(ics_event) => icalendar.add_event(ics_event),
            Err(err) => warn!("Leaving {record} (`{}`) out of the export: {err}", event.name),
        }
    }

    icalendar
}

fn utc(at: Timestamp) -> Result<String, CalendarError> {
    DateTime::from_timestamp(at.seconds(), 0)
        .map(|datetime| datetime.format("%Y%m%dT%H%M%SZ").to_string())
        .ok_or(CalendarError::TimestampOutOfRange(at.seconds()))
}

fn gregorian_date(registry: &CalendarRegistry, at: Timestamp) -> Result<String, CalendarError> {
    let date = registry.from_absolute(&CalendarId::GREGORIAN, at)?;
    Ok(format!("{:04}{:02}{:02}", date.year, date.month, date.day))
}

fn ics_duration(seconds: u64) -> String {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
    let days = seconds / SECONDS_PER_DAY;
    let hours = seconds % SECONDS_PER_DAY / SECONDS_PER_HOUR;
    let minutes = seconds % SECONDS_PER_HOUR / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || secs > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if secs > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}
