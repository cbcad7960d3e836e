use crate::clock::Clock;
use crate::data_manager::DataManager;
use crate::events::{CoordinatorEvent, EventHub};
use crate::models::WarmupStep;
use crate::notifications::{NotificationBridge, RequestId};
use crate::timer_engine::{RestTimer, TimerError, WarmupAdvance, WarmupSequence, WorkoutTimer};
use crate::timer_snapshot::TimerSnapshot;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const REST_NOTIFICATION_TITLE: &str = "Rest complete";
const REST_NOTIFICATION_BODY: &str = "Time for the next set";

/// Cancellation key used when the issuing process is gone and the original
/// request id with it. Platform bridges are expected to tag the rest alert
/// with this key.
pub const REST_NOTIFICATION_KEY: &str = "rest-complete";

/// Owns the workout, rest and warmup timers for the one live session.
///
/// Every workout/rest transition persists a `TimerSnapshot`; on foreground
/// (or after a process restart) the snapshot is reloaded and elapsed or
/// remaining time is recomputed from the stored absolute timestamps. A rest
/// countdown found already overdue on restore resolves as an immediate
/// natural completion. Snapshot writes and notification calls are
/// best-effort: their failures are logged and the in-memory timers stay
/// authoritative.
///
/// `tick()` is caller-driven; the coordinator never spawns threads.
pub struct TimerCoordinator {
    workout: WorkoutTimer,
    rest: RestTimer,
    warmups: WarmupSequence,
    data: DataManager,
    notifications: Box<dyn NotificationBridge>,
    events: EventHub,
    clock: Arc<dyn Clock>,
    pending_rest_notification: Option<RequestId>,
}

impl TimerCoordinator {
    pub fn new(
        data: DataManager,
        clock: Arc<dyn Clock>,
        notifications: Box<dyn NotificationBridge>,
    ) -> Self {
        Self {
            workout: WorkoutTimer::new(),
            rest: RestTimer::new(),
            warmups: WarmupSequence::new(),
            data,
            notifications,
            events: EventHub::new(),
            clock,
            pending_rest_notification: None,
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn start_workout(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.workout.start(now)?;
        self.persist_snapshot();
        self.events
            .emit(CoordinatorEvent::WorkoutTick { elapsed_seconds: 0 });
        Ok(())
    }

    pub fn pause_workout(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.workout.pause(now)?;
        self.persist_snapshot();
        self.events.emit(CoordinatorEvent::WorkoutTick {
            elapsed_seconds: self.workout.elapsed_seconds(now),
        });
        Ok(())
    }

    pub fn resume_workout(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.workout.resume(now)?;
        self.persist_snapshot();
        self.events.emit(CoordinatorEvent::WorkoutTick {
            elapsed_seconds: self.workout.elapsed_seconds(now),
        });
        Ok(())
    }

    /// Returns the final total, the authoritative session duration.
    pub fn stop_workout(&mut self) -> Result<u32, TimerError> {
        let now = self.clock.now();
        let total = self.workout.stop(now)?;
        self.persist_snapshot();
        Ok(total)
    }

    pub fn workout_is_running(&self) -> bool {
        self.workout.is_running()
    }

    pub fn workout_is_paused(&self) -> bool {
        self.workout.is_paused()
    }

    pub fn workout_elapsed_seconds(&self) -> u32 {
        self.workout.elapsed_seconds(self.clock.now())
    }

    pub fn start_rest(&mut self, duration_seconds: u32) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.rest.start(duration_seconds, now)?;
        self.schedule_rest_notification(duration_seconds);
        self.persist_snapshot();
        self.events.emit(CoordinatorEvent::RestTick {
            remaining_seconds: duration_seconds,
        });
        Ok(())
    }

    pub fn stop_rest(&mut self, manual: bool) -> Result<(), TimerError> {
        self.rest.stop()?;
        self.cancel_rest_notification();
        self.persist_snapshot();
        self.events.emit(CoordinatorEvent::RestCompleted { manual });
        Ok(())
    }

    /// Preset tap while a countdown runs: stop as manual, then start fresh.
    pub fn restart_rest(&mut self, duration_seconds: u32) -> Result<(), TimerError> {
        if self.rest.is_running() {
            self.stop_rest(true)?;
        }
        self.start_rest(duration_seconds)
    }

    pub fn rest_is_running(&self) -> bool {
        self.rest.is_running()
    }

    pub fn rest_remaining_seconds(&self) -> u32 {
        self.rest.remaining_seconds(self.clock.now())
    }

    pub fn begin_warmups(&mut self, steps: Vec<WarmupStep>) -> Result<(), TimerError> {
        self.warmups.begin(steps)
    }

    pub fn start_current_warmup(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.warmups.start_current(now)
    }

    pub fn advance_warmup(&mut self) -> Result<(), TimerError> {
        match self.warmups.advance()? {
            WarmupAdvance::StepAdvanced { index } => self.emit_warmup_advanced(index),
            WarmupAdvance::SequenceCompleted => {
                self.events.emit(CoordinatorEvent::WarmupSequenceCompleted);
            }
            WarmupAdvance::NoChange => {}
        }
        Ok(())
    }

    /// Skipping the rest of the sequence reads the same as finishing it.
    pub fn cancel_warmups(&mut self) -> Result<(), TimerError> {
        self.warmups.cancel_all()?;
        self.events.emit(CoordinatorEvent::WarmupSequenceCompleted);
        Ok(())
    }

    pub fn warmup_state(&self) -> &WarmupSequence {
        &self.warmups
    }

    pub fn warmup_remaining_seconds(&self) -> u32 {
        self.warmups.remaining_seconds(self.clock.now())
    }

    /// Periodic wake-up from the presentation layer. Recomputes everything
    /// from absolute timestamps, so a missed tick never loses time.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if self.workout.is_running() {
            self.events.emit(CoordinatorEvent::WorkoutTick {
                elapsed_seconds: self.workout.elapsed_seconds(now),
            });
        }
        if self.rest.is_running() {
            let remaining = self.rest.remaining_seconds(now);
            if self.rest.poll_expired(now) {
                self.cancel_rest_notification();
                self.persist_snapshot();
                self.events
                    .emit(CoordinatorEvent::RestCompleted { manual: false });
            } else {
                self.events.emit(CoordinatorEvent::RestTick {
                    remaining_seconds: remaining,
                });
            }
        }
        match self.warmups.poll(now) {
            WarmupAdvance::NoChange => {}
            WarmupAdvance::StepAdvanced { index } => self.emit_warmup_advanced(index),
            WarmupAdvance::SequenceCompleted => {
                self.events.emit(CoordinatorEvent::WarmupSequenceCompleted);
            }
        }
    }

    /// Must run before suspension completes: the snapshot write is the only
    /// thing that lets a killed process pick the timers back up, and the
    /// pending notification is what surfaces rest completion while suspended.
    pub fn handle_background(&mut self) {
        self.persist_snapshot();
        if self.rest.is_running() && self.pending_rest_notification.is_none() {
            let remaining = self.rest.remaining_seconds(self.clock.now());
            self.schedule_rest_notification(remaining);
        }
    }

    /// Reload the persisted snapshot and recompute timer state from it.
    pub fn handle_foreground(&mut self) {
        let snapshot = match self.data.load_timer_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(err) => {
                eprintln!("Failed to load timer snapshot: {err}");
                return;
            }
        };
        self.apply_snapshot(snapshot);
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            workout_active: !self.workout.is_idle(),
            workout_accumulated_seconds: self.workout.accumulated_seconds(),
            workout_segment_started_at: self
                .workout
                .segment_started_at()
                .map(|value| value.to_rfc3339()),
            rest_active: self.rest.is_running(),
            rest_initial_duration_seconds: self.rest.initial_duration_seconds(),
            rest_segment_started_at: self
                .rest
                .segment_started_at()
                .map(|value| value.to_rfc3339()),
        }
    }

    fn apply_snapshot(&mut self, snapshot: TimerSnapshot) {
        self.workout = if snapshot.workout_active {
            let segment = snapshot
                .workout_segment_started_at
                .as_deref()
                .and_then(parse_rfc3339);
            if snapshot.workout_segment_started_at.is_some() && segment.is_none() {
                eprintln!("Ignoring unreadable workout segment start in timer snapshot");
            }
            WorkoutTimer::restore(snapshot.workout_accumulated_seconds, segment)
        } else {
            WorkoutTimer::new()
        };

        self.rest = RestTimer::new();
        if snapshot.rest_active {
            match snapshot
                .rest_segment_started_at
                .as_deref()
                .and_then(parse_rfc3339)
            {
                Some(started_at) => {
                    self.rest =
                        RestTimer::restore(snapshot.rest_initial_duration_seconds, started_at);
                    // the alert was scheduled by the previous process; only
                    // the well-known key can cancel it now
                    self.pending_rest_notification = Some(REST_NOTIFICATION_KEY.to_string());
                    let now = self.clock.now();
                    if self.rest.poll_expired(now) {
                        // the countdown ran out while the process was away
                        self.cancel_rest_notification();
                        self.persist_snapshot();
                        self.events
                            .emit(CoordinatorEvent::RestCompleted { manual: false });
                    }
                }
                None => eprintln!("Ignoring unreadable rest segment start in timer snapshot"),
            }
        }
    }

    fn emit_warmup_advanced(&self, index: usize) {
        let now = self.clock.now();
        if let Some(step) = self.warmups.current_step() {
            self.events.emit(CoordinatorEvent::WarmupAdvanced {
                index,
                name: step.name.clone(),
                remaining_seconds: self.warmups.remaining_seconds(now),
            });
        }
    }

    fn persist_snapshot(&self) {
        let snapshot = self.snapshot();
        let result = if snapshot.is_empty() {
            self.data.clear_timer_snapshot()
        } else {
            self.data.save_timer_snapshot(&snapshot)
        };
        if let Err(err) = result {
            eprintln!("Failed to persist timer snapshot: {err}");
        }
    }

    fn schedule_rest_notification(&mut self, after_seconds: u32) {
        match self.notifications.schedule_one_shot(
            after_seconds,
            REST_NOTIFICATION_TITLE,
            REST_NOTIFICATION_BODY,
        ) {
            Ok(request_id) => self.pending_rest_notification = Some(request_id),
            Err(err) => eprintln!("Failed to schedule rest notification: {err}"),
        }
    }

    fn cancel_rest_notification(&mut self) {
        if let Some(request_id) = self.pending_rest_notification.take() {
            if let Err(err) = self.notifications.cancel_pending(&request_id) {
                eprintln!("Failed to cancel rest notification: {err}");
            }
        }
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::TimerCoordinator;
    use crate::clock::{Clock, ManualClock};
    use crate::data_manager::DataManager;
    use crate::events::CoordinatorEvent;
    use crate::models::WarmupStep;
    use crate::notifications::{NotificationBridge, NotificationError, RequestId};
    use crate::timer_engine::TimerError;
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!(
            "liftmate_coordinator_test_{nanos}_{counter}_{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[derive(Debug, Default)]
    struct BridgeLog {
        scheduled: Vec<(u32, RequestId)>,
        cancelled: Vec<RequestId>,
        fail_scheduling: bool,
    }

    struct TestBridge {
        log: Arc<Mutex<BridgeLog>>,
        counter: AtomicU64,
    }

    impl TestBridge {
        fn new(log: Arc<Mutex<BridgeLog>>) -> Self {
            Self {
                log,
                counter: AtomicU64::new(0),
            }
        }
    }

    impl NotificationBridge for TestBridge {
        fn schedule_one_shot(
            &self,
            after_seconds: u32,
            _title: &str,
            _body: &str,
        ) -> Result<RequestId, NotificationError> {
            let mut log = self.log.lock().expect("bridge log");
            if log.fail_scheduling {
                return Err(NotificationError::Scheduling("scheduler down".to_string()));
            }
            let id = format!("request-{}", self.counter.fetch_add(1, Ordering::Relaxed));
            log.scheduled.push((after_seconds, id.clone()));
            Ok(id)
        }

        fn cancel_pending(&self, request_id: &RequestId) -> Result<(), NotificationError> {
            let mut log = self.log.lock().expect("bridge log");
            log.cancelled.push(request_id.clone());
            Ok(())
        }
    }

    struct Harness {
        coordinator: TimerCoordinator,
        clock: Arc<ManualClock>,
        log: Arc<Mutex<BridgeLog>>,
        events: Receiver<CoordinatorEvent>,
        dir: PathBuf,
    }

    impl Harness {
        fn drain(&self) -> Vec<CoordinatorEvent> {
            self.events.try_iter().collect()
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn harness() -> Harness {
        harness_in(temp_dir(), None)
    }

    fn harness_in(dir: PathBuf, clock: Option<Arc<ManualClock>>) -> Harness {
        let manager = DataManager::new(&dir).expect("create manager");
        let clock = clock.unwrap_or_else(|| {
            Arc::new(ManualClock::new(
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            ))
        });
        let log = Arc::new(Mutex::new(BridgeLog::default()));
        let bridge = TestBridge::new(Arc::clone(&log));
        let coordinator =
            TimerCoordinator::new(manager, Arc::clone(&clock) as Arc<dyn Clock>, Box::new(bridge));
        let events = coordinator.events().subscribe();
        Harness {
            coordinator,
            clock,
            log,
            events,
            dir,
        }
    }

    /// Fresh coordinator over the same base dir and clock, as after a
    /// process restart.
    fn restarted(harness: &Harness) -> Harness {
        harness_in(harness.dir.clone(), Some(Arc::clone(&harness.clock)))
    }

    fn completions(events: &[CoordinatorEvent]) -> Vec<bool> {
        events
            .iter()
            .filter_map(|event| match event {
                CoordinatorEvent::RestCompleted { manual } => Some(*manual),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn workout_elapsed_tracks_pauses_through_coordinator() {
        let mut h = harness();
        h.coordinator.start_workout().expect("start");
        h.clock.advance_seconds(60);
        h.coordinator.pause_workout().expect("pause");
        h.clock.advance_seconds(600);
        assert_eq!(h.coordinator.workout_elapsed_seconds(), 60);

        h.coordinator.resume_workout().expect("resume");
        h.clock.advance_seconds(30);
        assert_eq!(h.coordinator.workout_elapsed_seconds(), 90);

        let total = h.coordinator.stop_workout().expect("stop");
        assert_eq!(total, 90);
        assert_eq!(h.coordinator.workout_elapsed_seconds(), 0);
    }

    #[test]
    fn workout_restores_across_process_restart_without_drift() {
        let mut h = harness();
        h.coordinator.start_workout().expect("start");

        h.clock.advance_seconds(300);
        let mut restored = restarted(&h);
        restored.coordinator.handle_foreground();

        assert!(restored.coordinator.workout_is_running());
        assert_eq!(restored.coordinator.workout_elapsed_seconds(), 300);
    }

    #[test]
    fn paused_workout_restores_with_held_elapsed() {
        let mut h = harness();
        h.coordinator.start_workout().expect("start");
        h.clock.advance_seconds(30);
        h.coordinator.pause_workout().expect("pause");

        h.clock.advance_seconds(500);
        let mut restored = restarted(&h);
        restored.coordinator.handle_foreground();

        assert!(restored.coordinator.workout_is_paused());
        assert_eq!(restored.coordinator.workout_elapsed_seconds(), 30);
        restored.coordinator.resume_workout().expect("resume");
        restored.clock.advance_seconds(10);
        assert_eq!(restored.coordinator.workout_elapsed_seconds(), 40);
    }

    #[test]
    fn overdue_rest_resolves_as_single_natural_completion_on_restore() {
        let mut h = harness();
        h.coordinator.start_rest(101).expect("start rest");

        h.clock.advance_seconds(150);
        let mut restored = restarted(&h);
        restored.coordinator.handle_foreground();

        assert!(!restored.coordinator.rest_is_running());
        assert_eq!(restored.coordinator.rest_remaining_seconds(), 0);
        assert_eq!(completions(&restored.drain()), vec![false]);

        restored.coordinator.tick();
        assert!(completions(&restored.drain()).is_empty());
    }

    #[test]
    fn restored_rest_cancels_by_well_known_key_on_manual_stop() {
        let mut h = harness();
        h.coordinator.start_rest(300).expect("start rest");

        h.clock.advance_seconds(60);
        let mut restored = restarted(&h);
        restored.coordinator.handle_foreground();
        assert!(restored.coordinator.rest_is_running());

        restored.coordinator.stop_rest(true).expect("stop rest");

        let log = restored.log.lock().expect("log");
        assert_eq!(
            log.cancelled,
            vec![super::REST_NOTIFICATION_KEY.to_string()]
        );
    }

    #[test]
    fn rest_completion_distinguishes_manual_from_natural() {
        let mut h = harness();
        h.coordinator.start_rest(60).expect("start rest");
        h.coordinator.stop_rest(true).expect("stop rest");
        assert_eq!(completions(&h.drain()), vec![true]);

        h.coordinator.start_rest(5).expect("start rest");
        h.clock.advance_seconds(10);
        h.coordinator.tick();
        assert_eq!(completions(&h.drain()), vec![false]);
    }

    #[test]
    fn rest_notification_is_scheduled_and_cancelled() {
        let mut h = harness();
        h.coordinator.start_rest(90).expect("start rest");

        let scheduled = h.log.lock().expect("log").scheduled.clone();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0, 90);

        h.coordinator.stop_rest(true).expect("stop rest");
        let log = h.log.lock().expect("log");
        assert_eq!(log.cancelled, vec![scheduled[0].1.clone()]);
    }

    #[test]
    fn natural_expiry_cancels_the_pending_notification() {
        let mut h = harness();
        h.coordinator.start_rest(30).expect("start rest");
        h.clock.advance_seconds(45);
        h.coordinator.tick();

        let log = h.log.lock().expect("log");
        assert_eq!(log.cancelled.len(), 1);
    }

    #[test]
    fn notification_failure_never_blocks_the_countdown() {
        let mut h = harness();
        h.log.lock().expect("log").fail_scheduling = true;

        h.coordinator.start_rest(60).expect("start rest");
        h.clock.advance_seconds(20);
        assert_eq!(h.coordinator.rest_remaining_seconds(), 40);

        h.coordinator.stop_rest(true).expect("stop rest");
        assert!(h.log.lock().expect("log").cancelled.is_empty());
    }

    #[test]
    fn restart_rest_stops_manually_then_starts_fresh() {
        let mut h = harness();
        h.coordinator.start_rest(60).expect("start rest");
        h.clock.advance_seconds(10);
        h.coordinator.restart_rest(90).expect("restart rest");

        assert_eq!(h.coordinator.rest_remaining_seconds(), 90);
        let events = h.drain();
        assert_eq!(completions(&events), vec![true]);
        assert!(events.contains(&CoordinatorEvent::RestTick {
            remaining_seconds: 90
        }));

        let log = h.log.lock().expect("log");
        assert_eq!(log.scheduled.len(), 2);
        assert_eq!(log.cancelled.len(), 1);
    }

    #[test]
    fn workout_and_rest_persist_and_restore_together() {
        let mut h = harness();
        h.coordinator.start_workout().expect("start workout");
        h.clock.advance_seconds(120);
        h.coordinator.start_rest(90).expect("start rest");

        h.clock.advance_seconds(30);
        let mut restored = restarted(&h);
        restored.coordinator.handle_foreground();

        assert!(restored.coordinator.workout_is_running());
        assert_eq!(restored.coordinator.workout_elapsed_seconds(), 150);
        assert!(restored.coordinator.rest_is_running());
        assert_eq!(restored.coordinator.rest_remaining_seconds(), 60);
    }

    #[test]
    fn snapshot_is_cleared_once_both_timers_are_idle() {
        let mut h = harness();
        h.coordinator.start_workout().expect("start");
        h.coordinator.stop_workout().expect("stop");

        let manager = DataManager::new(&h.dir).expect("manager");
        assert!(manager.load_timer_snapshot().expect("load").is_none());
    }

    #[test]
    fn background_schedules_notification_for_running_rest() {
        let mut h = harness();
        // scheduling failed at start; backgrounding retries for the
        // remaining window
        h.log.lock().expect("log").fail_scheduling = true;
        h.coordinator.start_rest(90).expect("start rest");
        h.log.lock().expect("log").fail_scheduling = false;

        h.clock.advance_seconds(30);
        h.coordinator.handle_background();

        let log = h.log.lock().expect("log");
        assert_eq!(log.scheduled.len(), 1);
        assert_eq!(log.scheduled[0].0, 60);
    }

    #[test]
    fn warmup_flow_emits_advancement_and_completion() {
        let mut h = harness();
        h.coordinator
            .begin_warmups(vec![
                WarmupStep::new("March", 30),
                WarmupStep::new("Jumping jacks", 45),
            ])
            .expect("begin");
        h.coordinator.start_current_warmup().expect("start step");

        h.clock.advance_seconds(30);
        h.coordinator.tick();
        let events = h.drain();
        assert!(events.contains(&CoordinatorEvent::WarmupAdvanced {
            index: 1,
            name: "Jumping jacks".to_string(),
            remaining_seconds: 45,
        }));

        h.coordinator.advance_warmup().expect("advance");
        assert!(h
            .drain()
            .contains(&CoordinatorEvent::WarmupSequenceCompleted));
        assert!(!h.coordinator.warmup_state().is_active());
    }

    #[test]
    fn cancelling_warmups_reads_as_sequence_complete() {
        let mut h = harness();
        h.coordinator
            .begin_warmups(vec![WarmupStep::new("March", 30)])
            .expect("begin");

        h.coordinator.cancel_warmups().expect("cancel");

        assert!(h
            .drain()
            .contains(&CoordinatorEvent::WarmupSequenceCompleted));
        assert_eq!(
            h.coordinator.cancel_warmups(),
            Err(TimerError::SequenceNotActive)
        );
    }

    #[test]
    fn empty_warmup_list_is_reported_as_active_but_empty() {
        let mut h = harness();
        h.coordinator.begin_warmups(Vec::new()).expect("begin");

        let state = h.coordinator.warmup_state();
        assert!(state.is_active());
        assert!(state.is_empty());
        assert_eq!(h.coordinator.warmup_remaining_seconds(), 0);
    }
}
