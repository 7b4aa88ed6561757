//! Multicast value topics with last-value replay
//!
//! A [`Topic`] is the engine's publish/subscribe primitive: one producer-side
//! handle fanning values out to any number of subscribers, with the latest
//! published value cached in a single slot. Late subscribers replay that
//! cached value first, then receive every subsequent publish. Subscribers can
//! opt into distinct-until-changed filtering.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;

struct TopicShared<T> {
    /// Last published value; replayed to late subscribers.
    slot: Mutex<Option<T>>,
    tx: broadcast::Sender<T>,
}

/// Multicast topic with a single-slot replay cache.
pub struct Topic<T> {
    shared: Arc<TopicShared<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Topic<T> {
    /// Create an empty topic with the given broadcast capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(TopicShared {
                slot: Mutex::new(None),
                tx,
            }),
        }
    }

    /// Create a topic whose replay slot is pre-seeded.
    pub fn with_initial(value: T, capacity: usize) -> Self {
        let topic = Self::new(capacity);
        *topic.shared.slot.lock() = Some(value);
        topic
    }

    /// Publish a value to all subscribers and update the replay slot.
    ///
    /// The slot lock is held across the broadcast send so that
    /// [`Topic::subscribe`] observes either "value in replay slot" or "value
    /// on the live channel", never both and never neither.
    pub fn publish(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        *slot = Some(value.clone());
        let _ = self.shared.tx.send(value);
    }

    /// Latest published value, if any.
    pub fn latest(&self) -> Option<T> {
        self.shared.slot.lock().clone()
    }

    /// Subscribe, replaying the latest value before live publishes.
    pub fn subscribe(&self) -> TopicSubscriber<T> {
        let slot = self.shared.slot.lock();
        let rx = self.shared.tx.subscribe();
        TopicSubscriber {
            replay: slot.clone(),
            rx,
            shared: Arc::downgrade(&self.shared),
            distinct: false,
            last_seen: None,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.tx.receiver_count()
    }
}

/// Receiving half of a [`Topic`] subscription.
pub struct TopicSubscriber<T> {
    replay: Option<T>,
    rx: broadcast::Receiver<T>,
    /// Weak so that dropping the topic closes the stream.
    shared: Weak<TopicShared<T>>,
    distinct: bool,
    last_seen: Option<T>,
}

impl<T: Clone + PartialEq + Send + 'static> TopicSubscriber<T> {
    /// Enable distinct-until-changed filtering on this subscription.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Receive the next value, or `None` once the topic is gone.
    ///
    /// A lagged subscriber skips to the latest cached value rather than
    /// erroring; intermediate values it was too slow for are conflated away.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let next = if let Some(v) = self.replay.take() {
                Some(v)
            } else {
                match self.rx.recv().await {
                    Ok(v) => Some(v),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "topic subscriber lagged, resuming from latest");
                        match self.shared.upgrade() {
                            Some(shared) => {
                                // Re-subscribe under the slot lock so no
                                // value older than the returned one can
                                // arrive afterwards.
                                let slot = shared.slot.lock();
                                self.rx = shared.tx.subscribe();
                                slot.clone()
                            }
                            None => None,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            };

            let value = next?;
            if self.distinct {
                if self.last_seen.as_ref() == Some(&value) {
                    continue;
                }
                self.last_seen = Some(value.clone());
            }
            return Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replay_then_live() {
        let topic = Topic::with_initial(1u32, 16);
        let mut sub = topic.subscribe();

        assert_eq!(sub.recv().await, Some(1));
        topic.publish(2);
        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(topic.latest(), Some(2));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_latest_only() {
        let topic = Topic::new(16);
        topic.publish(1u32);
        topic.publish(2);

        let mut sub = topic.subscribe();
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_distinct_until_changed() {
        let topic = Topic::with_initial(5u32, 16);
        let mut sub = topic.subscribe().distinct();

        assert_eq!(sub.recv().await, Some(5));
        topic.publish(5);
        topic.publish(5);
        topic.publish(6);
        assert_eq!(sub.recv().await, Some(6));
    }

    #[tokio::test]
    async fn test_fan_out_to_multiple_subscribers() {
        let topic = Topic::new(16);
        let mut a = topic.subscribe();
        let mut b = topic.subscribe();

        topic.publish("x".to_string());
        assert_eq!(a.recv().await.as_deref(), Some("x"));
        assert_eq!(b.recv().await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_stream_closes_when_topic_dropped() {
        let topic = Topic::new(16);
        topic.publish(1u32);
        let mut sub = topic.subscribe();
        drop(topic);

        // Replay still delivered, then the stream ends.
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, None);
    }
}
