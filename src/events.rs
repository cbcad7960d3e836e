use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// Events surfaced to the presentation layer. Emission is scoped to the
/// owning component through an explicit hub rather than a global broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    WorkoutTick {
        elapsed_seconds: u32,
    },
    RestTick {
        remaining_seconds: u32,
    },
    RestCompleted {
        manual: bool,
    },
    WarmupAdvanced {
        index: usize,
        name: String,
        remaining_seconds: u32,
    },
    WarmupSequenceCompleted,
    SessionCreated {
        session_id: String,
    },
    SessionInstantiationFailed {
        reason: String,
    },
}

#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Mutex<Vec<Sender<CoordinatorEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<CoordinatorEvent> {
        let (sender, receiver) = channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(sender),
            Err(_) => eprintln!("Event hub lock failed"),
        }
        receiver
    }

    pub fn emit(&self, event: CoordinatorEvent) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            eprintln!("Event hub lock failed");
            return;
        };
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }
}
