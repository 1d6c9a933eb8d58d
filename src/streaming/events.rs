//! Notifications published by bounded streams and streaming channels.

use crate::AudioFormat;
use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use super::SourceId;

/// Raised by a [`super::BoundedAudioStream`] after a wraparound shift.
///
/// Carries the duration of the oldest audio that was discarded to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappedAround {
    /// Audio dropped from the front of the buffer.
    pub skipped: Duration,
}

/// Everything a streaming channel tells its subscribers.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// New bytes are about to be written to the channel's stream.
    SamplesReceived {
        /// Source the bytes belong to.
        source: SourceId,
        /// Stream-relative time at which the bytes start.
        stream_time: Duration,
        /// Format of `payload`.
        format: AudioFormat,
        /// The raw bytes as handed to `append`.
        payload: Arc<[u8]>,
        /// Absolute time of the first sample.
        absolute_time: SystemTime,
    },
    /// The channel's stream discarded old audio to make room.
    WrappedAround {
        /// Source whose stream wrapped.
        source: SourceId,
        /// Audio dropped from the front of the buffer.
        skipped: Duration,
    },
    /// Stream-relative time moved by `shift`; visual state should translate by the same amount.
    AudioShifted {
        /// Source whose timeline moved.
        source: SourceId,
        /// Amount by which every stream-relative time decreased.
        shift: Duration,
        /// Absolute time now mapped to stream position zero, including the
        /// channel's configured time shift.
        new_start_time: SystemTime,
    },
}

impl StreamEvent {
    /// Source this event was published for.
    pub const fn source(&self) -> &SourceId {
        match self {
            Self::SamplesReceived { source, .. }
            | Self::WrappedAround { source, .. }
            | Self::AudioShifted { source, .. } => source,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

enum Subscriber<E> {
    Callback(Callback<E>),
    Queue(Sender<E>),
}

impl<E> Clone for Subscriber<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Callback(callback) => Self::Callback(Arc::clone(callback)),
            Self::Queue(sender) => Self::Queue(sender.clone()),
        }
    }
}

/// Ordered, synchronous fan-out of events to callbacks and queues.
///
/// Events are delivered on the publishing thread in publish order. The
/// subscriber list is snapshotted before delivery, so callbacks may subscribe
/// or unsubscribe without deadlocking.
pub struct EventBus<E> {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<E>)>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a callback invoked for every published event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.insert(Subscriber::Callback(Arc::new(callback)))
    }

    /// Register an unbounded queue receiving a clone of every published event.
    ///
    /// The subscription is dropped once the receiver is gone.
    pub fn subscribe_queue(&self) -> Receiver<E> {
        let (sender, receiver) = unbounded();
        self.insert(Subscriber::Queue(sender));
        receiver
    }

    fn insert(&self, subscriber: Subscriber<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Deliver `event` to every subscriber.
    pub fn publish(&self, event: E) {
        let snapshot: Vec<(SubscriptionId, Subscriber<E>)> = self.subscribers.read().clone();
        let mut disconnected = Vec::new();

        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Callback(callback) => callback(&event),
                Subscriber::Queue(sender) => {
                    if sender.send(event.clone()).is_err() {
                        disconnected.push(id);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            tracing::debug!(count = disconnected.len(), "pruning disconnected event queues");
            self.subscribers
                .write()
                .retain(|(id, _)| !disconnected.contains(id));
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_delivery_order_and_unsubscribe() {
        let bus = EventBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(move |value| sink.lock().push(*value));

        bus.publish(1);
        bus.publish(2);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(3);

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_queue_subscriber_pruned_when_dropped() {
        let bus = EventBus::<u32>::new();
        let receiver = bus.subscribe_queue();
        bus.publish(7);
        assert_eq!(receiver.try_recv().ok(), Some(7));

        drop(receiver);
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(8);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_can_unsubscribe_itself() {
        let bus = Arc::new(EventBus::<u32>::new());
        let handle = Arc::clone(&bus);
        let counter = Arc::new(AtomicU64::new(0));
        let count = Arc::clone(&counter);
        let id_slot = Arc::new(Mutex::new(None::<SubscriptionId>));
        let slot = Arc::clone(&id_slot);

        let id = bus.subscribe(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock() {
                handle.unsubscribe(id);
            }
        });
        *id_slot.lock() = Some(id);

        bus.publish(1);
        bus.publish(2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
