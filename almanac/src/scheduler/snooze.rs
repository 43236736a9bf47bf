use tokio::sync::mpsc;

use crate::event::Channel;
use crate::store::RecordRef;
use crate::time::{SECONDS_PER_HOUR, SECONDS_PER_MINUTE};

/// Asks the scheduler to fire a channel of a record again after a delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnoozeRequest {
    pub record: RecordRef,
    pub is_reminder: bool,
    pub hours: u32,
    pub minutes: u32,
}

impl SnoozeRequest {
    pub fn channel(&self) -> Channel {
        Channel::from_is_reminder(self.is_reminder)
    }

    pub fn delay_seconds(&self) -> i64 {
        i64::from(self.hours) * SECONDS_PER_HOUR + i64::from(self.minutes) * SECONDS_PER_MINUTE
    }
}

/// Fire-and-forget handle for sending snooze requests to a running
/// scheduler.
#[derive(Debug, Clone)]
pub struct SnoozeSender(pub(crate) mpsc::UnboundedSender<SnoozeRequest>);

impl SnoozeSender {
    /// Returns `false` if the scheduler is gone.
    pub fn send(&self, request: SnoozeRequest) -> bool {
        self.0.send(request).is_ok()
    }
}

impl From<mpsc::UnboundedSender<SnoozeRequest>> for SnoozeSender {
    fn from(sender: mpsc::UnboundedSender<SnoozeRequest>) -> Self {
        Self(sender)
    }
}

/// What the activity window is handed when something fires.
#[derive(Debug, Clone)]
pub struct SnoozePrompt {
    pub record: RecordRef,
    pub is_reminder: bool,
    pub title: String,
    pub message: String,
    pub default_delay: (u32, u32),
    pub reply: SnoozeSender,
}

impl SnoozePrompt {
    pub fn snooze(&self, hours: u32, minutes: u32) -> bool {
        self.reply.send(SnoozeRequest {
            record: self.record,
            is_reminder: self.is_reminder,
            hours,
            minutes,
        })
    }

    pub fn snooze_default(&self) -> bool {
        let (hours, minutes) = self.default_delay;
        self.snooze(hours, minutes)
    }
}
