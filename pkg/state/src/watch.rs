use tokio::sync::broadcast;

/// Type of event in the watch stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Put,
    Delete,
}

/// A single state change: which key was written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: EventType,
    pub key: String,
}

/// Fan-out of state mutations to controllers.
///
/// Delivery is best effort: a slow receiver observes `RecvError::Lagged` and
/// is expected to fall back to a full resync.
#[derive(Clone)]
pub struct EventLog {
    sender: broadcast::Sender<WatchEvent>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Record a new event. Called by StateStore on put/delete.
    pub fn emit(&self, event_type: EventType, key: &str) {
        // No receivers is fine
        let _ = self.sender.send(WatchEvent {
            event_type,
            key: key.to_string(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.sender.subscribe()
    }
}
