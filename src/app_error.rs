use crate::data_manager::DataError;
use crate::notifications::NotificationError;
use crate::session_builder::SessionError;
use crate::timer_engine::TimerError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppErrorKind {
    System,
    Data,
    Timer,
    Session,
    Notification,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    detail: Option<String>,
    recoverable: bool,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            recoverable,
        }
    }

    pub fn with_detail(
        kind: AppErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
            recoverable,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::System, message, true)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn payload(&self) -> AppErrorPayload {
        AppErrorPayload {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl From<TimerError> for AppError {
    fn from(error: TimerError) -> Self {
        let detail = error.to_string();
        let message = match error {
            TimerError::AlreadyRunning => "The timer is already running",
            TimerError::NotRunning => "The timer is not running",
            TimerError::AlreadyPaused => "The timer is already paused",
            TimerError::NotPaused => "The timer is not paused",
            TimerError::SequenceNotActive => "No warmup sequence is in progress",
            TimerError::StepAlreadyRunning => "This warmup is already counting down",
            TimerError::NoCurrentStep => "There is no warmup to start",
        };
        Self::with_detail(AppErrorKind::Timer, message, detail, true)
    }
}

impl From<DataError> for AppError {
    fn from(error: DataError) -> Self {
        let detail = error.to_string();
        let message = match error {
            DataError::Io(_) => "Reading or writing workout data failed",
            DataError::Serde(_) => "Workout data could not be decoded",
            DataError::DateTime(_) => "A stored date could not be read",
        };
        Self::with_detail(AppErrorKind::Data, message, detail, true)
    }
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        let detail = error.to_string();
        let message = match error {
            SessionError::SourceUnavailable(_) => "This template is no longer available",
            SessionError::MissingRecord(_) => "That exercise or set no longer exists",
            SessionError::Storage(_) => "Saving the workout failed",
        };
        Self::with_detail(AppErrorKind::Session, message, detail, true)
    }
}

impl From<NotificationError> for AppError {
    fn from(error: NotificationError) -> Self {
        let detail = error.to_string();
        let message = match error {
            NotificationError::Scheduling(_) => "The rest reminder could not be scheduled",
            NotificationError::PermissionDenied => "Notifications are not permitted",
        };
        Self::with_detail(AppErrorKind::Notification, message, detail, true)
    }
}
