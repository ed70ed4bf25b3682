use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::DocumentEvent;

/// In-process event bus backed by `tokio::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DocumentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: DocumentEvent) -> Result<usize, broadcast::error::SendError<DocumentEvent>> {
        self.sender.send(event)
    }

    /// Publish, treating "nobody is listening" as success.
    pub fn emit(&self, event: DocumentEvent) {
        let kind = event.kind;
        match self.publish(event) {
            Ok(receivers) => tracing::trace!(?kind, receivers, "Document event published"),
            Err(_) => tracing::trace!(?kind, "Document event dropped: no subscribers"),
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::id::DocumentId;
    use crate::events::types::EventKind;

    fn event(kind: EventKind) -> DocumentEvent {
        DocumentEvent::new(kind, "article", &DocumentId::generate(), Some("en".into()))
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(event(EventKind::Create)).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::Create);
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(event(EventKind::Publish)).unwrap();

        assert_eq!(rx1.recv().await.unwrap().kind, EventKind::Publish);
        assert_eq!(rx2.recv().await.unwrap().kind, EventKind::Publish);
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.emit(event(EventKind::Delete));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn event_kind_wire_names() {
        let json = serde_json::to_value(EventKind::DraftDiscard).unwrap();
        assert_eq!(json, serde_json::json!("entry.draft-discard"));
    }
}
