use crate::clock::Clock;
use crate::data_manager::{DataError, DataManager};
use crate::events::{CoordinatorEvent, EventHub};
use crate::history::HistoryLookup;
use crate::models::{
    generate_id, Session, SessionExercise, SessionSet, TemplateExercise, DEFAULT_AD_HOC_SET_COUNT,
};
use std::fmt;

#[derive(Debug)]
pub enum SessionError {
    SourceUnavailable(String),
    MissingRecord(String),
    Storage(DataError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SourceUnavailable(template_id) => {
                write!(f, "Template no longer available: {template_id}")
            }
            SessionError::MissingRecord(what) => write!(f, "Record not found: {what}"),
            SessionError::Storage(err) => write!(f, "Storage error: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<DataError> for SessionError {
    fn from(value: DataError) -> Self {
        Self::Storage(value)
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Instantiates a session from a template: one session exercise per template
/// exercise in order, with set counts floored at what the user actually
/// performed last time and historical reps/weight carried forward per set
/// index. The whole graph is written as one unit; a failure leaves nothing
/// behind.
pub fn start_from_template(
    data: &DataManager,
    events: &EventHub,
    clock: &dyn Clock,
    history: &HistoryLookup,
    template_id: &str,
) -> SessionResult<Session> {
    match instantiate(data, clock, history, template_id) {
        Ok(session) => {
            events.emit(CoordinatorEvent::SessionCreated {
                session_id: session.id.clone(),
            });
            Ok(session)
        }
        Err(err) => {
            events.emit(CoordinatorEvent::SessionInstantiationFailed {
                reason: err.to_string(),
            });
            Err(err)
        }
    }
}

/// A session with no exercises and no template link; exercises are added
/// ad hoc while it runs.
pub fn create_blank(
    data: &DataManager,
    events: &EventHub,
    clock: &dyn Clock,
) -> SessionResult<Session> {
    let session = Session {
        id: generate_id("session"),
        started_at: clock.now().to_rfc3339(),
        duration_seconds: None,
        template_id: None,
        exercises: Vec::new(),
    };
    match data.save_session(session.clone()) {
        Ok(()) => {
            events.emit(CoordinatorEvent::SessionCreated {
                session_id: session.id.clone(),
            });
            Ok(session)
        }
        Err(err) => {
            let err = SessionError::from(err);
            events.emit(CoordinatorEvent::SessionInstantiationFailed {
                reason: err.to_string(),
            });
            Err(err)
        }
    }
}

fn instantiate(
    data: &DataManager,
    clock: &dyn Clock,
    history: &HistoryLookup,
    template_id: &str,
) -> SessionResult<Session> {
    // the in-memory handle may be stale; storage decides whether the
    // template still exists
    let template = data
        .template_by_id(template_id)?
        .ok_or_else(|| SessionError::SourceUnavailable(template_id.to_string()))?;
    let recent = data.recent_sessions(None)?;

    let mut ordered: Vec<&TemplateExercise> = template.exercises.iter().collect();
    ordered.sort_by_key(|item| item.order);

    let mut session = Session {
        id: generate_id("session"),
        started_at: clock.now().to_rfc3339(),
        duration_seconds: None,
        template_id: Some(template.id.clone()),
        exercises: Vec::new(),
    };

    for (order, template_exercise) in ordered.into_iter().enumerate() {
        let previous_count = history.last_set_count(&recent, &template_exercise.name);
        let sets_to_create = template_exercise.target_set_count.max(previous_count);
        let mut exercise = SessionExercise {
            id: generate_id("session-exercise"),
            // name snapshot: renaming the template later must not rewrite
            // past session displays
            name: template_exercise.name.clone(),
            order: order as u32,
            template_exercise_id: Some(template_exercise.id.clone()),
            sets: Vec::with_capacity(sets_to_create as usize),
        };
        for set_index in 0..sets_to_create {
            let mut set = SessionSet {
                id: generate_id("set"),
                set_index,
                reps: 0,
                weight: 0.0,
                is_complete: false,
            };
            if set_index < previous_count {
                if let Some((reps, weight)) =
                    history.last_set_data(&recent, &template_exercise.name, set_index)
                {
                    set.reps = reps;
                    set.weight = weight;
                    set.is_complete = reps > 0;
                }
            }
            exercise.sets.push(set);
        }
        session.exercises.push(exercise);
    }

    data.save_session(session.clone())?;
    Ok(session)
}

pub fn record_set(
    data: &DataManager,
    session: &mut Session,
    exercise_id: &str,
    set_index: u32,
    reps: u32,
    weight: f64,
    is_complete: bool,
) -> SessionResult<()> {
    let exercise = session
        .exercise_by_id_mut(exercise_id)
        .ok_or_else(|| SessionError::MissingRecord(format!("exercise {exercise_id}")))?;
    let set = exercise.set_at_mut(set_index).ok_or_else(|| {
        SessionError::MissingRecord(format!("set {set_index} in exercise {exercise_id}"))
    })?;
    set.reps = reps;
    set.weight = weight;
    set.is_complete = is_complete;
    data.save_session(session.clone())?;
    Ok(())
}

pub fn add_exercise(
    data: &DataManager,
    session: &mut Session,
    name: &str,
) -> SessionResult<String> {
    let exercise_id = session.add_exercise(name, DEFAULT_AD_HOC_SET_COUNT);
    data.save_session(session.clone())?;
    Ok(exercise_id)
}

pub fn add_set(
    data: &DataManager,
    session: &mut Session,
    exercise_id: &str,
) -> SessionResult<String> {
    let exercise = session
        .exercise_by_id_mut(exercise_id)
        .ok_or_else(|| SessionError::MissingRecord(format!("exercise {exercise_id}")))?;
    let set_id = exercise.add_set();
    data.save_session(session.clone())?;
    Ok(set_id)
}

/// Stamps the authoritative duration (from the workout timer's stop) and
/// finalizes the record.
pub fn complete_session(
    data: &DataManager,
    session: &mut Session,
    duration_seconds: u32,
) -> SessionResult<()> {
    session.duration_seconds = Some(duration_seconds);
    data.save_session(session.clone())?;
    Ok(())
}

/// Canceling discards the session entirely; no partial record survives.
pub fn cancel_session(data: &DataManager, session: &Session) -> SessionResult<()> {
    data.delete_session(&session.id)?;
    Ok(())
}
