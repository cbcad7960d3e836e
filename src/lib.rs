pub mod app_error;
pub mod clock;
pub mod coordinator;
pub mod data_manager;
pub mod events;
pub mod history;
pub mod models;
pub mod notifications;
pub mod session_builder;
pub mod timer_engine;
pub mod timer_snapshot;

pub use app_error::{AppError, AppErrorKind, AppErrorPayload};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::TimerCoordinator;
pub use data_manager::{DataError, DataManager, DataResult};
pub use events::{CoordinatorEvent, EventHub};
pub use history::{HistoryLookup, WeightProgressPoint};
pub use models::{
    Session, SessionExercise, SessionSet, Template, TemplateExercise, WarmupStep,
};
pub use notifications::{NotificationBridge, NotificationError, NullNotificationBridge};
pub use session_builder::{SessionError, SessionResult};
pub use timer_engine::{RestTimer, TimerError, WarmupAdvance, WarmupSequence, WorkoutTimer};
pub use timer_snapshot::TimerSnapshot;
