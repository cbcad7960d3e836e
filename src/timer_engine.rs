use crate::models::WarmupStep;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum TimerError {
    AlreadyRunning,
    NotRunning,
    AlreadyPaused,
    NotPaused,
    SequenceNotActive,
    StepAlreadyRunning,
    NoCurrentStep,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::AlreadyRunning => write!(f, "Timer already running"),
            TimerError::NotRunning => write!(f, "Timer not running"),
            TimerError::AlreadyPaused => write!(f, "Timer already paused"),
            TimerError::NotPaused => write!(f, "Timer not paused"),
            TimerError::SequenceNotActive => write!(f, "Warmup sequence not active"),
            TimerError::StepAlreadyRunning => write!(f, "Warmup step already running"),
            TimerError::NoCurrentStep => write!(f, "No warmup step to start"),
        }
    }
}

impl std::error::Error for TimerError {}

/// Count-up workout timer: Idle -> Running -> Paused -> Running -> ... -> Idle.
/// Elapsed time is always recomputed from the absolute segment-start
/// timestamp, never accumulated per tick.
#[derive(Debug, Default)]
pub struct WorkoutTimer {
    accumulated_seconds: u32,
    segment_started_at: Option<DateTime<Utc>>,
    paused: bool,
}

impl WorkoutTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore(accumulated_seconds: u32, segment_started_at: Option<DateTime<Utc>>) -> Self {
        Self {
            accumulated_seconds,
            segment_started_at,
            paused: segment_started_at.is_none(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.segment_started_at.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running() && !self.paused
    }

    pub fn accumulated_seconds(&self) -> u32 {
        self.accumulated_seconds
    }

    pub fn segment_started_at(&self) -> Option<DateTime<Utc>> {
        self.segment_started_at
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if !self.is_idle() {
            return Err(TimerError::AlreadyRunning);
        }
        self.accumulated_seconds = 0;
        self.segment_started_at = Some(now);
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.paused {
            return Err(TimerError::AlreadyPaused);
        }
        let started_at = self.segment_started_at.take().ok_or(TimerError::NotRunning)?;
        self.accumulated_seconds = self
            .accumulated_seconds
            .saturating_add(seconds_between(started_at, now));
        self.paused = true;
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if !self.paused {
            return Err(TimerError::NotPaused);
        }
        self.paused = false;
        self.segment_started_at = Some(now);
        Ok(())
    }

    /// Returns the final total as the authoritative session duration.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<u32, TimerError> {
        if self.is_idle() {
            return Err(TimerError::NotRunning);
        }
        let total = self.elapsed_seconds(now);
        self.accumulated_seconds = 0;
        self.segment_started_at = None;
        self.paused = false;
        Ok(total)
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u32 {
        let live = self
            .segment_started_at
            .map(|started_at| seconds_between(started_at, now))
            .unwrap_or(0);
        self.accumulated_seconds.saturating_add(live)
    }
}

/// Rest countdown: Idle -> Running -> Idle. Natural expiry is observed
/// through `poll_expired`, which reports true exactly once.
#[derive(Debug, Default)]
pub struct RestTimer {
    initial_duration_seconds: u32,
    segment_started_at: Option<DateTime<Utc>>,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn restore(initial_duration_seconds: u32, segment_started_at: DateTime<Utc>) -> Self {
        Self {
            initial_duration_seconds,
            segment_started_at: Some(segment_started_at),
        }
    }

    pub fn is_running(&self) -> bool {
        self.segment_started_at.is_some()
    }

    pub fn initial_duration_seconds(&self) -> u32 {
        self.initial_duration_seconds
    }

    pub fn segment_started_at(&self) -> Option<DateTime<Utc>> {
        self.segment_started_at
    }

    pub fn start(&mut self, duration_seconds: u32, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.is_running() {
            return Err(TimerError::AlreadyRunning);
        }
        self.initial_duration_seconds = duration_seconds;
        self.segment_started_at = Some(now);
        Ok(())
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        match self.segment_started_at {
            Some(started_at) => self
                .initial_duration_seconds
                .saturating_sub(seconds_between(started_at, now)),
            None => 0,
        }
    }

    /// True exactly once, at the first observation after the countdown ran
    /// out. Resets to Idle as a side effect so repeated polls stay false.
    pub fn poll_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() && self.remaining_seconds(now) == 0 {
            self.reset();
            return true;
        }
        false
    }

    pub fn stop(&mut self) -> Result<(), TimerError> {
        if !self.is_running() {
            return Err(TimerError::NotRunning);
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.initial_duration_seconds = 0;
        self.segment_started_at = None;
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum WarmupAdvance {
    NoChange,
    StepAdvanced { index: usize },
    SequenceCompleted,
}

/// Sequenced warmup countdown. Every step waits for an explicit
/// `start_current` before its countdown runs; an expired step auto-advances
/// to the next (again paused) step via `poll`. A `begin` with an empty list
/// enters a distinguished active-but-empty state so the caller can offer a
/// "nothing configured" affordance and still proceed.
#[derive(Debug, Default)]
pub struct WarmupSequence {
    steps: Vec<WarmupStep>,
    index: usize,
    step_started_at: Option<DateTime<Utc>>,
    active: bool,
}

impl WarmupSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active && self.steps.is_empty()
    }

    pub fn is_step_running(&self) -> bool {
        self.step_started_at.is_some()
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.active && self.index < self.steps.len() {
            Some(self.index)
        } else {
            None
        }
    }

    pub fn current_step(&self) -> Option<&WarmupStep> {
        if self.active {
            self.steps.get(self.index)
        } else {
            None
        }
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u32 {
        let Some(step) = self.current_step() else {
            return 0;
        };
        match self.step_started_at {
            Some(started_at) => step
                .duration_seconds
                .saturating_sub(seconds_between(started_at, now)),
            None => step.duration_seconds,
        }
    }

    pub fn begin(&mut self, steps: Vec<WarmupStep>) -> Result<(), TimerError> {
        if self.active {
            return Err(TimerError::AlreadyRunning);
        }
        self.steps = steps;
        self.index = 0;
        self.step_started_at = None;
        self.active = true;
        Ok(())
    }

    pub fn start_current(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        if !self.active {
            return Err(TimerError::SequenceNotActive);
        }
        if self.current_step().is_none() {
            return Err(TimerError::NoCurrentStep);
        }
        if self.step_started_at.is_some() {
            return Err(TimerError::StepAlreadyRunning);
        }
        self.step_started_at = Some(now);
        Ok(())
    }

    /// Auto-advances when the running step's countdown has run out.
    pub fn poll(&mut self, now: DateTime<Utc>) -> WarmupAdvance {
        if !self.active || self.step_started_at.is_none() {
            return WarmupAdvance::NoChange;
        }
        if self.remaining_seconds(now) > 0 {
            return WarmupAdvance::NoChange;
        }
        self.advance().unwrap_or(WarmupAdvance::NoChange)
    }

    pub fn advance(&mut self) -> Result<WarmupAdvance, TimerError> {
        if !self.active {
            return Err(TimerError::SequenceNotActive);
        }
        self.step_started_at = None;
        self.index = self.index.saturating_add(1);
        if self.index < self.steps.len() {
            Ok(WarmupAdvance::StepAdvanced { index: self.index })
        } else {
            self.finish();
            Ok(WarmupAdvance::SequenceCompleted)
        }
    }

    pub fn cancel_all(&mut self) -> Result<(), TimerError> {
        if !self.active {
            return Err(TimerError::SequenceNotActive);
        }
        self.finish();
        Ok(())
    }

    fn finish(&mut self) {
        self.steps.clear();
        self.index = 0;
        self.step_started_at = None;
        self.active = false;
    }
}

pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = end.signed_duration_since(start).num_seconds();
    if seconds <= 0 {
        0
    } else {
        seconds.min(u32::MAX as i64) as u32
    }
}
