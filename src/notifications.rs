use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub type RequestId = String;

#[derive(Debug)]
pub enum NotificationError {
    Scheduling(String),
    PermissionDenied,
}

impl fmt::Display for NotificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationError::Scheduling(message) => {
                write!(f, "Notification scheduling failed: {message}")
            }
            NotificationError::PermissionDenied => {
                write!(f, "Notification permission denied")
            }
        }
    }
}

impl std::error::Error for NotificationError {}

/// Delivery of local alerts at a future time, surfaced even while the app is
/// suspended. Best-effort only: the in-app countdown stays authoritative and
/// every failure is swallowed at the coordinator boundary.
pub trait NotificationBridge {
    fn schedule_one_shot(
        &self,
        after_seconds: u32,
        title: &str,
        body: &str,
    ) -> Result<RequestId, NotificationError>;

    /// `request_id` is either an id returned by `schedule_one_shot` or a
    /// well-known key a caller uses when the issuing process is gone.
    fn cancel_pending(&self, request_id: &RequestId) -> Result<(), NotificationError>;
}

/// Stand-in used where no platform delivery service is wired up.
#[derive(Debug, Default)]
pub struct NullNotificationBridge {
    counter: AtomicU64,
}

impl NullNotificationBridge {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationBridge for NullNotificationBridge {
    fn schedule_one_shot(
        &self,
        _after_seconds: u32,
        _title: &str,
        _body: &str,
    ) -> Result<RequestId, NotificationError> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!("notification-{id}"))
    }

    fn cancel_pending(&self, _request_id: &RequestId) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationBridge, NullNotificationBridge};

    #[test]
    fn null_bridge_hands_out_distinct_request_ids() {
        let bridge = NullNotificationBridge::new();
        let first = bridge
            .schedule_one_shot(60, "Rest complete", "Time for the next set")
            .expect("schedule");
        let second = bridge
            .schedule_one_shot(90, "Rest complete", "Time for the next set")
            .expect("schedule");

        assert_ne!(first, second);
        assert!(bridge.cancel_pending(&first).is_ok());
    }
}
