use crate::models::Session;

/// Answers "what did this exercise look like last time" against session
/// history. Sessions are matched by exercise name, so template-linked and
/// ad hoc exercises compare the same way. Expects slices ordered most
/// recent first, as returned by `DataManager::recent_sessions`.
///
/// The default lookup scans the full history; `with_window` bounds the scan
/// to the n most recent sessions for callers that prefer a cheap approximate
/// answer over finding rarely-performed exercises.
#[derive(Debug, Clone, Default)]
pub struct HistoryLookup {
    recent_window: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightProgressPoint {
    pub session_id: String,
    pub started_at: String,
    pub top_weight: f64,
}

impl HistoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(recent_window: usize) -> Self {
        Self {
            recent_window: Some(recent_window),
        }
    }

    /// Most recent meaningfully recorded (reps, weight) pair for the
    /// exercise at `set_index`. Zero-valued sets are treated as "not
    /// recorded" and the search continues into older sessions.
    pub fn last_set_data(
        &self,
        sessions: &[Session],
        exercise_name: &str,
        set_index: u32,
    ) -> Option<(u32, f64)> {
        for session in self.windowed(sessions) {
            let Some(exercise) = session
                .exercises
                .iter()
                .find(|item| item.name == exercise_name)
            else {
                continue;
            };
            let Some(set) = exercise.set_at(set_index) else {
                continue;
            };
            if set.reps > 0 || set.weight > 0.0 {
                return Some((set.reps, set.weight));
            }
        }
        None
    }

    /// Set count of the most recent session exercise with this name,
    /// 0 if the exercise has never been performed.
    pub fn last_set_count(&self, sessions: &[Session], exercise_name: &str) -> u32 {
        self.windowed(sessions)
            .find_map(|session| {
                session
                    .exercises
                    .iter()
                    .find(|item| item.name == exercise_name)
            })
            .map(|exercise| exercise.sets.len() as u32)
            .unwrap_or(0)
    }

    /// Per-session top completed weight, oldest first, for the
    /// weight-over-time progress view. Sessions without a completed set for
    /// the exercise are skipped.
    pub fn weight_progress(
        &self,
        sessions: &[Session],
        exercise_name: &str,
    ) -> Vec<WeightProgressPoint> {
        let windowed: Vec<&Session> = self.windowed(sessions).collect();
        windowed
            .into_iter()
            .rev()
            .filter_map(|session| {
                let exercise = session
                    .exercises
                    .iter()
                    .find(|item| item.name == exercise_name)?;
                let top_weight = exercise
                    .sets
                    .iter()
                    .filter(|set| set.is_complete && set.weight > 0.0)
                    .map(|set| set.weight)
                    .fold(None, |best: Option<f64>, weight| {
                        Some(best.map_or(weight, |value| value.max(weight)))
                    })?;
                Some(WeightProgressPoint {
                    session_id: session.id.clone(),
                    started_at: session.started_at.clone(),
                    top_weight,
                })
            })
            .collect()
    }

    fn windowed<'a>(&self, sessions: &'a [Session]) -> impl Iterator<Item = &'a Session> {
        let take = self.recent_window.unwrap_or(sessions.len());
        sessions.iter().take(take)
    }
}
