use tokio::sync::broadcast;
use tracing::trace;
use txsettle_types::{EngineEvent, EventSink};

/// Default channel capacity; slower receivers lag and lose the oldest events
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Publishes engine events on a tokio broadcast channel
///
/// Sending never blocks. With no subscribers the event is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: EngineEvent) {
        let event_type = event.event_type();
        if self.tx.send(event).is_err() {
            trace!(event_type, "no event subscribers");
        }
    }
}
