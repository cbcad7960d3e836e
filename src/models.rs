use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_AD_HOC_SET_COUNT: u32 = 3;
pub const WARMUP_DURATION_MIN_SECONDS: u32 = 5;
pub const WARMUP_DURATION_MAX_SECONDS: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub exercises: Vec<TemplateExercise>,
    #[serde(default)]
    pub warmups: Vec<WarmupStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExercise {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub target_set_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmupStep {
    pub name: String,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub started_at: String,
    pub duration_seconds: Option<u32>,
    pub template_id: Option<String>,
    pub exercises: Vec<SessionExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExercise {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub template_exercise_id: Option<String>,
    pub sets: Vec<SessionSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSet {
    pub id: String,
    pub set_index: u32,
    pub reps: u32,
    pub weight: f64,
    pub is_complete: bool,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id("template"),
            name: name.into(),
            created_at: now_rfc3339(),
            exercises: Vec::new(),
            warmups: Vec::new(),
        }
    }

    pub fn exercise_by_id(&self, exercise_id: &str) -> Option<&TemplateExercise> {
        self.exercises.iter().find(|item| item.id == exercise_id)
    }

    pub fn add_exercise(&mut self, name: impl Into<String>, target_set_count: u32) -> String {
        let exercise = TemplateExercise {
            id: generate_id("exercise"),
            name: name.into(),
            order: self.exercises.len() as u32,
            target_set_count,
        };
        let id = exercise.id.clone();
        self.exercises.push(exercise);
        id
    }

    pub fn remove_exercise(&mut self, exercise_id: &str) -> bool {
        let before = self.exercises.len();
        self.exercises.retain(|item| item.id != exercise_id);
        let removed = self.exercises.len() != before;
        if removed {
            self.renumber_exercises();
        }
        removed
    }

    pub fn move_exercise(&mut self, exercise_id: &str, new_order: u32) -> bool {
        let Some(from) = self
            .exercises
            .iter()
            .position(|item| item.id == exercise_id)
        else {
            return false;
        };
        let to = (new_order as usize).min(self.exercises.len().saturating_sub(1));
        let exercise = self.exercises.remove(from);
        self.exercises.insert(to, exercise);
        self.renumber_exercises();
        true
    }

    pub fn set_warmups(&mut self, warmups: Vec<WarmupStep>) {
        self.warmups = warmups.into_iter().map(WarmupStep::clamped).collect();
    }

    // order values must stay 0..n-1 after every insert/delete/move
    fn renumber_exercises(&mut self) {
        for (index, exercise) in self.exercises.iter_mut().enumerate() {
            exercise.order = index as u32;
        }
    }
}

impl WarmupStep {
    pub fn new(name: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            name: name.into(),
            duration_seconds,
        }
    }

    pub fn clamped(self) -> Self {
        Self {
            name: self.name,
            duration_seconds: self
                .duration_seconds
                .clamp(WARMUP_DURATION_MIN_SECONDS, WARMUP_DURATION_MAX_SECONDS),
        }
    }
}

impl Session {
    pub fn exercise_by_id(&self, exercise_id: &str) -> Option<&SessionExercise> {
        self.exercises.iter().find(|item| item.id == exercise_id)
    }

    pub fn exercise_by_id_mut(&mut self, exercise_id: &str) -> Option<&mut SessionExercise> {
        self.exercises.iter_mut().find(|item| item.id == exercise_id)
    }

    pub fn add_exercise(&mut self, name: impl Into<String>, set_count: u32) -> String {
        let mut exercise = SessionExercise {
            id: generate_id("session-exercise"),
            name: name.into(),
            order: self.exercises.len() as u32,
            template_exercise_id: None,
            sets: Vec::new(),
        };
        for _ in 0..set_count {
            exercise.add_set();
        }
        let id = exercise.id.clone();
        self.exercises.push(exercise);
        id
    }

    pub fn is_completed(&self) -> bool {
        self.duration_seconds.is_some()
    }
}

impl SessionExercise {
    pub fn set_at(&self, set_index: u32) -> Option<&SessionSet> {
        self.sets.iter().find(|item| item.set_index == set_index)
    }

    pub fn set_at_mut(&mut self, set_index: u32) -> Option<&mut SessionSet> {
        self.sets
            .iter_mut()
            .find(|item| item.set_index == set_index)
    }

    pub fn add_set(&mut self) -> String {
        let set = SessionSet {
            id: generate_id("set"),
            set_index: self.sets.len() as u32,
            reps: 0,
            weight: 0.0,
            is_complete: false,
        };
        let id = set.id.clone();
        self.sets.push(set);
        id
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

pub(crate) fn generate_id(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos}-{counter}-{}", std::process::id())
}
