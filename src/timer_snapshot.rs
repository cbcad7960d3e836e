use serde::{Deserialize, Serialize};

/// Durable timer state. Written on every workout/rest transition and on
/// app-background so a restarted process can pick the countdowns back up
/// from the stored absolute timestamps. The warmup sequence is deliberately
/// absent: it is session-local and never survives process death.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub workout_active: bool,
    pub workout_accumulated_seconds: u32,
    pub workout_segment_started_at: Option<String>,
    pub rest_active: bool,
    #[serde(default)]
    pub rest_initial_duration_seconds: u32,
    pub rest_segment_started_at: Option<String>,
}

impl TimerSnapshot {
    pub fn is_empty(&self) -> bool {
        !self.workout_active && !self.rest_active
    }
}
