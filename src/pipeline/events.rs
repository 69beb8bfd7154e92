//! Event broadcast from the executive to observers.
//!
//! Subscribers get a bounded crossbeam receiver. Publishing never blocks the
//! update: a full channel drops the event for that subscriber, and a
//! disconnected receiver is pruned.

use crate::pipeline::error::ErrorRecord;
use crate::pipeline::id::{AlgorithmId, PortId};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Something the executive did while servicing an update.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// An algorithm ran and produced new data on `port`.
    Executed {
        algorithm: AlgorithmId,
        port: PortId,
        piece: i64,
        pieces: i64,
    },

    /// Cached data on `port` answered the request.
    Reused { algorithm: AlgorithmId, port: PortId },

    /// Data on `port` was dropped after its consumer executed.
    Released { port: PortId },

    /// A failure was recorded.
    Error(ErrorRecord),

    /// The update of `port` was cancelled and rolled back.
    Cancelled { port: PortId },
}

/// Fan-out of pipeline events to any number of subscribers.
#[derive(Debug)]
pub struct EventBus {
    subscribers: Vec<Sender<PipelineEvent>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PipelineEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("Event subscriber lagging, dropping {:?}", event);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}
