//! The polling scheduler.
//!
//! Every tick the scheduler asks the event store for events and reminders
//! whose visible time has passed and whose fired flag is still clear, marks
//! each one fired, persists it, and only then hands it to the activity
//! effect and the activity window. Snooze requests arrive on a channel and
//! are applied between scans.

mod clock;
mod snooze;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use quick_cache::sync::Cache;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::calendar::CalendarRegistry;
use crate::error::Result;
use crate::event::{Activity, Category, Channel, EventRecord};
use crate::store::{EventStore, Predicate, RecordRef};
use crate::time::Timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use snooze::{SnoozePrompt, SnoozeRequest, SnoozeSender};

const CATEGORY_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between scans.
    pub tick: Duration,

    /// Categories are re-read from the store every this many ticks.
    pub refresh_every: u32,

    /// Prompt text for the activity window. `{name}` and `{channel}` are
    /// substituted.
    pub snooze_message: String,

    /// Delay offered by default, as (hours, minutes).
    pub default_snooze: (u32, u32),
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(30),
            refresh_every: 4,
            snooze_message: "{name} ({channel}) is due. Snooze?".to_owned(),
            default_snooze: (0, 5),
        }
    }
}

/// Handed to the activity effect when an event or reminder fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    pub record: RecordRef,
    pub channel: Channel,
    pub name: String,
    pub category: Option<Category>,
    pub activity: Activity,
    pub at: Timestamp,
}

/// Performs the side effects of a firing. Must return promptly; anything
/// slow belongs on a task of its own.
pub trait ActivityEffect: Send + Sync {
    fn fire(&self, firing: Firing);
}

/// Offers the user a chance to snooze what just fired. Answers go back
/// through [`SnoozePrompt::reply`].
pub trait ActivityWindow: Send + Sync {
    fn present(&self, prompt: SnoozePrompt);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub fired_events: Vec<RecordRef>,
    pub fired_reminders: Vec<RecordRef>,
    pub failures: usize,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.fired_events.is_empty() && self.fired_reminders.is_empty() && self.failures == 0
    }

    fn fired(&mut self, channel: Channel, record: RecordRef) {
        match channel {
            Channel::Event => self.fired_events.push(record),
            Channel::Reminder => self.fired_reminders.push(record),
        }
    }
}

pub struct Scheduler {
    store: Arc<dyn EventStore>,
    registry: Arc<CalendarRegistry>,
    clock: Arc<dyn Clock>,
    effect: Arc<dyn ActivityEffect>,
    window: Arc<dyn ActivityWindow>,
    config: SchedulerConfig,
    categories: Cache<String, Category>,
    ticks: AtomicU64,
    /// Serializes scans and snoozes so no record is touched by both at once.
    busy: tokio::sync::Mutex<()>,
    snooze_tx: mpsc::UnboundedSender<SnoozeRequest>,
    snooze_rx: Mutex<Option<mpsc::UnboundedReceiver<SnoozeRequest>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<CalendarRegistry>,
        effect: Arc<dyn ActivityEffect>,
        window: Arc<dyn ActivityWindow>,
    ) -> Self {
        let (snooze_tx, snooze_rx) = mpsc::unbounded_channel();
        Self {
            store,
            registry,
            clock: Arc::new(SystemClock),
            effect,
            window,
            config: SchedulerConfig::default(),
            categories: Cache::new(CATEGORY_CACHE_CAPACITY),
            ticks: AtomicU64::new(0),
            busy: tokio::sync::Mutex::new(()),
            snooze_tx,
            snooze_rx: Mutex::new(Some(snooze_rx)),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn snooze_sender(&self) -> SnoozeSender {
        SnoozeSender(self.snooze_tx.clone())
    }

    /// Cached category, as of the last refresh.
    pub fn category(&self, name: &str) -> Option<Category> {
        self.categories.get(name)
    }

    /// Runs the scheduler on its own task: a scan every tick, snooze
    /// requests as they arrive.
    pub fn start(self) -> JoinHandle<()> {
        let snoozes = self
            .snooze_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        tokio::spawn(async move {
            self.run(snoozes).await;
        })
    }

    async fn run(self, mut snoozes: Option<mpsc::UnboundedReceiver<SnoozeRequest>>) {
        let mut interval = time::interval(self.config.tick);
        // Ticks missed while a scan was running are dropped, not replayed.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(report) = self.tick().await {
                        if !report.is_empty() {
                            debug!("Scan finished: {report:?}");
                        }
                    }
                }
                Some(request) = next_snooze(&mut snoozes) => {
                    if let Err(err) = self.apply_snooze(request).await {
                        warn!("Failed to snooze {}: {err}", request.record);
                    }
                }
            }
        }
    }

    /// One poll-and-fire pass. Returns `None` without doing anything when a
    /// previous pass is still in flight.
    pub async fn tick(&self) -> Option<ScanReport> {
        let Ok(_busy) = self.busy.try_lock() else {
            debug!("Previous scan still running, dropping tick");
            return None;
        };

        let now = self.clock.now();
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        if tick % u64::from(self.config.refresh_every.max(1)) == 0 {
            self.refresh_categories().await;
        }

        let mut report = ScanReport::default();
        self.scan(Channel::Event, now, &mut report).await;
        self.scan(Channel::Reminder, now, &mut report).await;
        Some(report)
    }

    /// Applies a snooze: the channel fires again `hours:minutes` from now.
    /// Returns `false` for a reminder snooze on a record without a reminder.
    pub async fn apply_snooze(&self, request: SnoozeRequest) -> Result<bool> {
        let _busy = self.busy.lock().await;
        let now = self.clock.now();
        let until = now + request.delay_seconds();
        let channel = request.channel();

        let mut event = self.store.load(request.record).await?;
        if !event.snooze(channel, until) {
            warn!(
                "Ignoring reminder snooze for {}: reminder is disabled",
                request.record
            );
            return Ok(false);
        }

        self.persist(request.record, &mut event, now).await?;
        info!(
            "Snoozed {channel} of `{}` ({}) until {until}",
            event.name, request.record
        );
        Ok(true)
    }

    /// Applies every snooze request queued so far. Only useful while the
    /// scheduler is not running on its own task.
    pub async fn drain_snoozes(&self) -> usize {
        let requests = {
            let mut receiver = self.snooze_rx.lock().unwrap_or_else(PoisonError::into_inner);
            let mut requests = Vec::new();
            if let Some(receiver) = receiver.as_mut() {
                while let Ok(request) = receiver.try_recv() {
                    requests.push(request);
                }
            }
            requests
        };

        let mut applied = 0;
        for request in requests {
            match self.apply_snooze(request).await {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(err) => warn!("Failed to snooze {}: {err}", request.record),
            }
        }
        applied
    }

    async fn refresh_categories(&self) {
        match self.store.categories().await {
            Ok(categories) => {
                self.categories.clear();
                let count = categories.len();
                for category in categories {
                    self.categories.insert(category.name.clone(), category);
                }
                debug!("Refreshed {count} categories");
            }
            Err(err) => warn!("Failed to refresh categories: {err}"),
        }
    }

    async fn scan(&self, channel: Channel, now: Timestamp, report: &mut ScanReport) {
        let predicate = match channel {
            Channel::Event => Predicate::due_events(now),
            Channel::Reminder => Predicate::due_reminders(now),
        };

        let due = match self.store.query(&predicate).await {
            Ok(due) => due,
            Err(err) => {
                warn!("Failed to query due {channel}s: {err}");
                report.failures += 1;
                return;
            }
        };

        for record in due {
            match self.fire(record, channel, now).await {
                Ok(true) => report.fired(channel, record),
                Ok(false) => {}
                Err(err) => {
                    warn!("Skipping {channel} of {record} until the next tick: {err}");
                    report.failures += 1;
                }
            }
        }
    }

    async fn fire(&self, record: RecordRef, channel: Channel, now: Timestamp) -> Result<bool> {
        let mut event = self.store.load(record).await?;

        // The query result may be stale by the time the record is loaded.
        if !event.is_due(channel, now) {
            return Ok(false);
        }

        event.mark_fired(channel);
        self.persist(record, &mut event, now).await?;

        info!("Firing {channel} of `{}` ({record})", event.name);

        let category = event
            .category
            .as_deref()
            .and_then(|name| self.categories.get(name));

        self.effect.fire(Firing {
            record,
            channel,
            name: event.name.clone(),
            category,
            activity: event.activity_for(channel).clone(),
            at: now,
        });
        self.window.present(self.prompt(record, channel, &event.name));

        Ok(true)
    }

    async fn persist(&self, record: RecordRef, event: &mut EventRecord, now: Timestamp) -> Result<()> {
        event.refresh_schedule(&self.registry, now)?;
        self.store.save(record, event).await?;
        Ok(())
    }

    fn prompt(&self, record: RecordRef, channel: Channel, name: &str) -> SnoozePrompt {
        let message = self
            .config
            .snooze_message
            .replace("{name}", name)
            .replace("{channel}", &channel.to_string());

        SnoozePrompt {
            record,
            is_reminder: channel.is_reminder(),
            title: name.to_owned(),
            message,
            default_delay: self.config.default_snooze,
            reply: self.snooze_sender(),
        }
    }
}

async fn next_snooze(
    receiver: &mut Option<mpsc::UnboundedReceiver<SnoozeRequest>>,
) -> Option<SnoozeRequest> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    use super::*;
    use crate::calendar::CalendarId;
    use crate::error::StoreError;
    use crate::event::Reminder;
    use crate::policy::EventType;
    use crate::store::MemoryStore;
    use crate::time::TimeRepresentation;

    // 2024-05-01 09:30:00 UTC
    const START: Timestamp = Timestamp(1_714_555_800);
    const MINUTE: i64 = 60;

    #[derive(Default)]
    struct RecordingEffect(Mutex<Vec<Firing>>);

    impl RecordingEffect {
        fn firings(&self) -> Vec<Firing> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ActivityEffect for RecordingEffect {
        fn fire(&self, firing: Firing) {
            self.0.lock().unwrap().push(firing);
        }
    }

    #[derive(Default)]
    struct RecordingWindow(Mutex<Vec<SnoozePrompt>>);

    impl RecordingWindow {
        fn last(&self) -> SnoozePrompt {
            self.0.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl ActivityWindow for RecordingWindow {
        fn present(&self, prompt: SnoozePrompt) {
            self.0.lock().unwrap().push(prompt);
        }
    }

    struct Harness {
        scheduler: Scheduler,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        effect: Arc<RecordingEffect>,
        window: Arc<RecordingWindow>,
        registry: Arc<CalendarRegistry>,
    }

    impl Harness {
        fn new(now: Timestamp) -> Self {
            Self::with_store(Arc::new(MemoryStore::new()), now)
        }

        fn with_store(store: Arc<MemoryStore>, now: Timestamp) -> Self {
            let registry = Arc::new(CalendarRegistry::default());
            let clock = Arc::new(ManualClock::new(now));
            let effect = Arc::new(RecordingEffect::default());
            let window = Arc::new(RecordingWindow::default());

            let scheduler = Scheduler::new(
                store.clone(),
                registry.clone(),
                effect.clone(),
                window.clone(),
            )
            .with_clock(clock.clone());

            Self {
                scheduler,
                store,
                clock,
                effect,
                window,
                registry,
            }
        }

        async fn add(&self, mut event: EventRecord) -> RecordRef {
            event
                .refresh_schedule(&self.registry, self.clock.now())
                .unwrap();
            self.store.insert(&event).await.unwrap()
        }
    }

    fn appointment(name: &str) -> EventRecord {
        let start = TimeRepresentation::date(CalendarId::GREGORIAN, 2024, 5, 1, 9, 30, 0);
        EventRecord::new(name, start, EventType::Appointment)
    }

    #[tokio::test]
    async fn fires_due_event_at_most_once() {
        let harness = Harness::new(START - MINUTE);
        let record = harness
            .add(appointment("Standup").with_activity(Activity {
                notification: Some("Standup now".into()),
                ..Activity::default()
            }))
            .await;

        let early = harness.scheduler.tick().await.unwrap();
        assert!(early.is_empty());

        harness.clock.set(START);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![record]);

        let again = harness.scheduler.tick().await.unwrap();
        assert!(again.is_empty());

        let firings = harness.effect.firings();
        assert_eq!(firings.len(), 1);
        assert_eq!(firings[0].channel, Channel::Event);
        assert_eq!(firings[0].activity.notification.as_deref(), Some("Standup now"));
        assert!(harness.store.load(record).await.unwrap().event_activity_fired());
    }

    #[tokio::test]
    async fn snoozed_event_fires_again_after_delay() {
        let harness = Harness::new(START - MINUTE);
        let record = harness.add(appointment("Call mom")).await;

        harness.clock.set(START);
        harness.scheduler.tick().await.unwrap();
        assert_eq!(harness.effect.firings().len(), 1);

        let snoozed = harness
            .scheduler
            .apply_snooze(SnoozeRequest {
                record,
                is_reminder: false,
                hours: 0,
                minutes: 10,
            })
            .await
            .unwrap();
        assert!(snoozed);

        let stored = harness.store.load(record).await.unwrap();
        assert_eq!(stored.activity_snoozed_time(), Some(START + 10 * MINUTE));
        assert_eq!(stored.next_occurrence(), Some(START + 10 * MINUTE));
        assert!(!stored.event_activity_fired());

        assert!(harness.scheduler.tick().await.unwrap().is_empty());
        assert_eq!(harness.effect.firings().len(), 1);

        harness.clock.advance(10 * MINUTE);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![record]);

        assert!(harness.scheduler.tick().await.unwrap().is_empty());
        assert_eq!(harness.effect.firings().len(), 2);
    }

    #[tokio::test]
    async fn window_prompt_round_trips_a_snooze() {
        let harness = Harness::new(START);
        let record = harness.add(appointment("Lunch")).await;
        // Saved at its own start time, so it counts as already fired.
        let mut event = harness.store.load(record).await.unwrap();
        event.rearm();
        event.refresh_schedule(&harness.registry, START).unwrap();
        harness.store.save(record, &event).await.unwrap();

        harness.scheduler.tick().await.unwrap();
        let prompt = harness.window.last();
        assert_eq!(prompt.record, record);
        assert!(!prompt.is_reminder);
        assert_eq!(prompt.message, "Lunch (event) is due. Snooze?");

        assert!(prompt.snooze_default());
        assert_eq!(harness.scheduler.drain_snoozes().await, 1);

        let stored = harness.store.load(record).await.unwrap();
        assert_eq!(stored.activity_snoozed_time(), Some(START + 5 * MINUTE));
    }

    #[tokio::test]
    async fn reminders_fire_separately() {
        let harness = Harness::new(START - 60 * MINUTE);
        let record = harness
            .add(appointment("Flight").with_reminder(Reminder::before(30 * MINUTE as u64)))
            .await;
        let silent = harness.add(appointment("No reminder")).await;

        harness.clock.set(START - 30 * MINUTE);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_reminders, vec![record]);
        assert!(report.fired_events.is_empty());

        harness.clock.set(START);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![record, silent]);
        assert!(report.fired_reminders.is_empty());

        let channels = harness
            .effect
            .firings()
            .iter()
            .map(|firing| (firing.record, firing.channel))
            .collect::<Vec<_>>();
        assert_eq!(
            channels,
            vec![
                (record, Channel::Reminder),
                (record, Channel::Event),
                (silent, Channel::Event)
            ]
        );
    }

    #[tokio::test]
    async fn snoozed_reminder_fires_again_after_delay() {
        let harness = Harness::new(START - 60 * MINUTE);
        let record = harness
            .add(appointment("Flight").with_reminder(Reminder::before(30 * MINUTE as u64)))
            .await;

        harness.clock.set(START - 30 * MINUTE);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_reminders, vec![record]);

        let snoozed = harness
            .scheduler
            .apply_snooze(SnoozeRequest {
                record,
                is_reminder: true,
                hours: 0,
                minutes: 10,
            })
            .await
            .unwrap();
        assert!(snoozed);

        let stored = harness.store.load(record).await.unwrap();
        assert_eq!(stored.reminder_snoozed_time(), Some(START - 20 * MINUTE));
        assert_eq!(stored.next_reminder(), Some(START - 20 * MINUTE));
        assert_eq!(stored.activity_snoozed_time(), None);

        assert!(harness.scheduler.tick().await.unwrap().is_empty());

        harness.clock.advance(10 * MINUTE);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_reminders, vec![record]);
        assert!(report.fired_events.is_empty());

        assert!(harness.scheduler.tick().await.unwrap().is_empty());

        let reminders = harness
            .effect
            .firings()
            .iter()
            .filter(|firing| firing.channel == Channel::Reminder)
            .count();
        assert_eq!(reminders, 2);
        assert_eq!(harness.effect.firings().len(), 2);
    }

    #[tokio::test]
    async fn reminder_snooze_requires_enabled_reminder() {
        let harness = Harness::new(START - MINUTE);
        let record = harness.add(appointment("Plain")).await;

        let applied = harness
            .scheduler
            .apply_snooze(SnoozeRequest {
                record,
                is_reminder: true,
                hours: 1,
                minutes: 0,
            })
            .await
            .unwrap();

        assert!(!applied);
        let stored = harness.store.load(record).await.unwrap();
        assert_eq!(stored.reminder_snoozed_time(), None);
        assert_eq!(stored.next_reminder(), None);
    }

    #[tokio::test]
    async fn failing_record_does_not_block_others() {
        let harness = Harness::new(START - MINUTE);
        let broken = harness.add(appointment("Broken")).await;
        let healthy = harness.add(appointment("Healthy")).await;
        harness.store.fail_loads(broken, true);

        harness.clock.set(START);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![healthy]);
        assert_eq!(report.failures, 1);

        harness.store.fail_loads(broken, false);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![broken]);
        assert_eq!(report.failures, 0);
    }

    #[tokio::test]
    async fn effect_waits_for_successful_save() {
        let harness = Harness::new(START - MINUTE);
        let record = harness.add(appointment("Unsaved")).await;
        harness.store.fail_saves(record, true);

        harness.clock.set(START);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.failures, 1);
        assert!(harness.effect.firings().is_empty());
        assert!(!harness.store.load(record).await.unwrap().event_activity_fired());

        harness.store.fail_saves(record, false);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![record]);
    }

    #[tokio::test]
    async fn unknown_calendar_aborts_only_that_record() {
        let harness = Harness::new(START - MINUTE);
        let record = harness.add(appointment("Orphan")).await;
        let other = harness.add(appointment("Other")).await;

        let mut event = harness.store.load(record).await.unwrap();
        let mut start = event.start().clone();
        start.calendar = CalendarId::new("julian");
        event.set_start(start);
        harness.store.save(record, &event).await.unwrap();

        harness.clock.set(START);
        let report = harness.scheduler.tick().await.unwrap();
        assert_eq!(report.fired_events, vec![other]);
        assert_eq!(report.failures, 1);
        assert_eq!(harness.effect.firings().len(), 1);
    }

    #[tokio::test]
    async fn firing_carries_cached_category() {
        let harness = Harness::new(START - MINUTE);
        let work = Category {
            name: "Work".into(),
            color: [10, 20, 30],
        };
        harness.store.save_category(&work).await.unwrap();
        harness.add(appointment("Review").with_category("Work")).await;

        harness.scheduler.tick().await.unwrap();
        assert_eq!(harness.scheduler.category("Work"), Some(work.clone()));

        harness.clock.set(START);
        harness.scheduler.tick().await.unwrap();
        assert_eq!(harness.effect.firings()[0].category, Some(work));
    }

    struct GatedStore {
        inner: MemoryStore,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl EventStore for GatedStore {
        async fn query(&self, predicate: &Predicate) -> Result<Vec<RecordRef>, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.query(predicate).await
        }

        async fn load(&self, record: RecordRef) -> Result<EventRecord, StoreError> {
            self.inner.load(record).await
        }

        async fn save(&self, record: RecordRef, event: &EventRecord) -> Result<(), StoreError> {
            self.inner.save(record, event).await
        }

        async fn insert(&self, event: &EventRecord) -> Result<RecordRef, StoreError> {
            self.inner.insert(event).await
        }

        async fn remove(&self, record: RecordRef) -> Result<(), StoreError> {
            self.inner.remove(record).await
        }

        async fn categories(&self) -> Result<Vec<Category>, StoreError> {
            self.inner.categories().await
        }

        async fn save_category(&self, category: &Category) -> Result<(), StoreError> {
            self.inner.save_category(category).await
        }
    }

    #[tokio::test]
    async fn overlapping_tick_is_dropped() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            Arc::new(CalendarRegistry::default()),
            Arc::new(RecordingEffect::default()),
            Arc::new(RecordingWindow::default()),
        ));

        let first = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.tick().await }
        });

        store.entered.notified().await;
        assert!(scheduler.tick().await.is_none());

        // Event scan, then reminder scan.
        store.release.notify_one();
        store.entered.notified().await;
        store.release.notify_one();

        assert!(first.await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn started_scheduler_polls_and_applies_snoozes() {
        let harness = Harness::new(START - MINUTE);
        let record = harness.add(appointment("Background")).await;
        let Harness {
            scheduler,
            store,
            clock,
            effect,
            ..
        } = harness;

        let sender = scheduler.snooze_sender();
        let handle = scheduler.start();

        clock.set(START);
        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(effect.firings().len(), 1);

        assert!(sender.send(SnoozeRequest {
            record,
            is_reminder: false,
            hours: 2,
            minutes: 0,
        }));
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            store.load(record).await.unwrap().activity_snoozed_time(),
            Some(START + 120 * MINUTE)
        );

        handle.abort();
    }
}
