use crate::models::{Session, Template, WarmupStep};
use crate::timer_snapshot::TimerSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum DataError {
    Io(io::Error),
    Serde(serde_json::Error),
    DateTime(String),
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Io(err) => write!(f, "I/O error: {err}"),
            DataError::Serde(err) => write!(f, "Serialization error: {err}"),
            DataError::DateTime(err) => write!(f, "DateTime parse error: {err}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<io::Error> for DataError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

impl From<chrono::ParseError> for DataError {
    fn from(value: chrono::ParseError) -> Self {
        Self::DateTime(value.to_string())
    }
}

pub type DataResult<T> = Result<T, DataError>;

/// JSON record store over a base directory. Writes are atomic
/// (temp file + rename), so a record file is never observed half-written.
#[derive(Debug, Clone)]
pub struct DataManager {
    base_dir: PathBuf,
    templates_path: PathBuf,
    sessions_path: PathBuf,
    snapshot_path: PathBuf,
}

impl DataManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> DataResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let templates_path = base_dir.join("templates.json");
        let sessions_path = base_dir.join("sessions.json");
        let snapshot_path = base_dir.join("timer_snapshot.json");

        let manager = Self {
            base_dir,
            templates_path,
            sessions_path,
            snapshot_path,
        };

        if !manager.templates_path.exists() {
            manager.write_json(&manager.templates_path, &Vec::<Template>::new())?;
        }
        if !manager.sessions_path.exists() {
            manager.write_json(&manager.sessions_path, &Vec::<Session>::new())?;
        }

        Ok(manager)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn load_templates(&self) -> DataResult<Vec<Template>> {
        if !self.templates_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.templates_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let templates = serde_json::from_str(&contents)?;
        Ok(templates)
    }

    pub fn template_by_id(&self, template_id: &str) -> DataResult<Option<Template>> {
        let templates = self.load_templates()?;
        Ok(templates.into_iter().find(|item| item.id == template_id))
    }

    pub fn save_template(&self, template: Template) -> DataResult<()> {
        let mut templates = self.load_templates()?;
        if let Some(existing) = templates.iter_mut().find(|item| item.id == template.id) {
            *existing = template;
        } else {
            templates.push(template);
        }
        self.save_templates(&templates)
    }

    pub fn save_templates(&self, templates: &[Template]) -> DataResult<()> {
        self.write_json(&self.templates_path, templates)
    }

    /// Cascades to the template's exercises and warmup list, which live
    /// inside the record.
    pub fn delete_template(&self, template_id: &str) -> DataResult<bool> {
        let mut templates = self.load_templates()?;
        let before = templates.len();
        templates.retain(|item| item.id != template_id);
        let removed = templates.len() != before;
        if removed {
            self.save_templates(&templates)?;
        }
        Ok(removed)
    }

    pub fn warmups(&self, template_id: &str) -> DataResult<Vec<WarmupStep>> {
        Ok(self
            .template_by_id(template_id)?
            .map(|template| template.warmups)
            .unwrap_or_default())
    }

    /// Durations are clamped to the configurable warmup range on write.
    pub fn set_warmups(&self, template_id: &str, warmups: Vec<WarmupStep>) -> DataResult<()> {
        let mut templates = self.load_templates()?;
        let Some(template) = templates.iter_mut().find(|item| item.id == template_id) else {
            return Ok(());
        };
        template.set_warmups(warmups);
        self.save_templates(&templates)
    }

    pub fn warmup_at(&self, template_id: &str, index: usize) -> DataResult<Option<WarmupStep>> {
        Ok(self
            .warmups(template_id)?
            .into_iter()
            .nth(index))
    }

    pub fn remove_warmup(&self, template_id: &str, index: usize) -> DataResult<()> {
        let mut templates = self.load_templates()?;
        let Some(template) = templates.iter_mut().find(|item| item.id == template_id) else {
            return Ok(());
        };
        if index >= template.warmups.len() {
            return Ok(());
        }
        template.warmups.remove(index);
        self.save_templates(&templates)
    }

    pub fn load_sessions(&self) -> DataResult<Vec<Session>> {
        if !self.sessions_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.sessions_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sessions = serde_json::from_str(&contents)?;
        Ok(sessions)
    }

    pub fn save_session(&self, session: Session) -> DataResult<()> {
        let mut sessions = self.load_sessions()?;
        if let Some(existing) = sessions.iter_mut().find(|item| item.id == session.id) {
            *existing = session;
        } else {
            sessions.push(session);
        }
        self.save_sessions(&sessions)
    }

    pub fn save_sessions(&self, sessions: &[Session]) -> DataResult<()> {
        self.write_json(&self.sessions_path, sessions)
    }

    pub fn delete_session(&self, session_id: &str) -> DataResult<bool> {
        let mut sessions = self.load_sessions()?;
        let before = sessions.len();
        sessions.retain(|item| item.id != session_id);
        let removed = sessions.len() != before;
        if removed {
            self.save_sessions(&sessions)?;
        }
        Ok(removed)
    }

    /// Most recent first. `limit` of `None` returns the full history.
    pub fn recent_sessions(&self, limit: Option<usize>) -> DataResult<Vec<Session>> {
        let sessions = self.load_sessions()?;
        let mut keyed = sessions
            .into_iter()
            .try_fold(Vec::new(), |mut acc, session| {
                let started_at = Self::parse_datetime(&session.started_at)?;
                acc.push((started_at, session));
                Ok::<_, DataError>(acc)
            })?;
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
        let mut sessions: Vec<Session> = keyed.into_iter().map(|(_, session)| session).collect();
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    pub fn sessions_with_exercise(&self, exercise_name: &str) -> DataResult<Vec<Session>> {
        let sessions = self.recent_sessions(None)?;
        Ok(sessions
            .into_iter()
            .filter(|session| {
                session
                    .exercises
                    .iter()
                    .any(|exercise| exercise.name == exercise_name)
            })
            .collect())
    }

    pub fn load_timer_snapshot(&self) -> DataResult<Option<TimerSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.snapshot_path)?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let snapshot = serde_json::from_str(&contents)?;
        Ok(Some(snapshot))
    }

    pub fn save_timer_snapshot(&self, snapshot: &TimerSnapshot) -> DataResult<()> {
        self.write_json(&self.snapshot_path, snapshot)
    }

    pub fn clear_timer_snapshot(&self) -> DataResult<()> {
        match fs::remove_file(&self.snapshot_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DataError::from(err)),
        }
    }

    fn parse_datetime(value: &str) -> DataResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> DataResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, path) {
            Ok(()) => Ok(()),
            Err(_err) if path.exists() => {
                let _ = fs::remove_file(path);
                fs::rename(&temp_path, path).map_err(DataError::from)
            }
            Err(err) => Err(DataError::from(err)),
        }
    }
}
