use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::DocumentChanged;

/// In-process event bus backed by `tokio::broadcast`.
/// Delivery past the channel is the subscriber's concern.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DocumentChanged>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Having no subscribers is not an error for the publisher; the number of
    /// receivers reached is returned.
    pub fn publish(&self, event: DocumentChanged) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(
                    document_id = %event.document_id,
                    kind = ?event.kind,
                    "no subscribers for document event"
                );
                0
            }
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentChanged> {
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
