//! In-process publish/subscribe for fleet snapshots.
//!
//! Subscribers are plain closures keyed by [`Topic`]. Publishing is
//! synchronous: every subscriber of the snapshot's topic runs before
//! [`NotificationBus::publish`] returns. A panicking subscriber is isolated and
//! recorded; the rest still receive the snapshot.

use crate::error::NotifyError;
use crate::types::{DeliveryFailure, FleetSnapshot, Topic};
use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback = Arc<dyn Fn(&FleetSnapshot) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct DeliveryFailureQueue {
    entries: VecDeque<DeliveryFailure>,
    max_size: usize,
}

impl DeliveryFailureQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size,
        }
    }

    pub fn push(&mut self, entry: DeliveryFailure) {
        if self.max_size == 0 {
            return;
        }

        if self.entries.len() >= self.max_size {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> Vec<DeliveryFailure> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DeliveryFailureQueue {
    fn default() -> Self {
        Self::new(256)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: BTreeMap<Topic, Vec<(u64, Callback)>>,
}

impl Registry {
    fn remove(&mut self, topic: Topic, id: u64) -> bool {
        let Some(list) = self.subscribers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(subscriber_id, _)| *subscriber_id != id);
        before != list.len()
    }
}

/// Outcome of one [`NotificationBus::publish`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<NotifyError>,
}

/// Handle returned by [`NotificationBus::subscribe`].
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: Topic,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Returns `false` when the callback was already gone (or the bus dropped).
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(self.topic, self.id),
            None => false,
        }
    }
}

#[derive(Clone, Default)]
pub struct NotificationBus {
    registry: Arc<Mutex<Registry>>,
    failures: Arc<Mutex<DeliveryFailureQueue>>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        let counts = registry
            .subscribers
            .iter()
            .map(|(topic, list)| (*topic, list.len()))
            .collect::<BTreeMap<_, _>>();
        f.debug_struct("NotificationBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&FleetSnapshot) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .subscribers
            .entry(topic)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            id,
            topic,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        lock(&self.registry)
            .subscribers
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Deliver `snapshot` to every subscriber of its topic.
    ///
    /// The registry lock is released before callbacks run, so a subscriber may
    /// subscribe or unsubscribe from inside its callback.
    pub fn publish(&self, snapshot: &FleetSnapshot) -> DeliveryReport {
        let topic = snapshot.topic();
        let callbacks = lock(&self.registry)
            .subscribers
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        let mut report = DeliveryReport::default();
        for (subscriber_id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(snapshot))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(
                        %topic,
                        subscriber_id,
                        error = %message,
                        "fleet subscriber panicked; continuing with remaining subscribers"
                    );
                    lock(&self.failures).push(DeliveryFailure {
                        topic,
                        subscriber_id,
                        error: message.clone(),
                        at: Utc::now(),
                    });
                    report.failed.push(NotifyError::SubscriberPanicked {
                        topic,
                        subscriber_id,
                        message,
                    });
                }
            }
        }
        report
    }

    pub fn failed_deliveries(&self) -> Vec<DeliveryFailure> {
        lock(&self.failures).entries()
    }

    pub fn clear_failed_deliveries(&self) {
        lock(&self.failures).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn publish_reaches_only_subscribers_of_the_topic() {
        let bus = NotificationBus::new();
        let deployments = counter();
        let metrics = counter();

        let seen = deployments.clone();
        let _a = bus.subscribe(Topic::Deployments, move |snapshot| {
            assert_eq!(snapshot.topic(), Topic::Deployments);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let seen = metrics.clone();
        let _b = bus.subscribe(Topic::Metrics, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let report = bus.publish(&FleetSnapshot::Deployments(Vec::new()));
        assert_eq!(report.delivered, 1);
        assert!(report.failed.is_empty());
        assert_eq!(deployments.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = NotificationBus::new();
        let hits = counter();
        let seen = hits.clone();
        let subscription = bus.subscribe(Topic::HealthChecks, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let id = subscription.id();

        bus.publish(&FleetSnapshot::HealthChecks(Vec::new()));
        assert!(subscription.unsubscribe());
        bus.publish(&FleetSnapshot::HealthChecks(Vec::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(Topic::HealthChecks), 0);

        let stale = Subscription {
            id,
            topic: Topic::HealthChecks,
            registry: Arc::downgrade(&bus.registry),
        };
        assert!(!stale.unsubscribe());
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = NotificationBus::new();
        let hits = counter();

        let _bad = bus.subscribe(Topic::Metrics, |_| panic!("subscriber exploded"));
        let seen = hits.clone();
        let _good = bus.subscribe(Topic::Metrics, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let report = bus.publish(&FleetSnapshot::Metrics(Vec::new()));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let failures = bus.failed_deliveries();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].topic, Topic::Metrics);
        assert_eq!(failures[0].error, "subscriber exploded");

        bus.clear_failed_deliveries();
        assert!(bus.failed_deliveries().is_empty());
    }

    #[test]
    fn subscriber_may_unsubscribe_during_delivery() {
        let bus = NotificationBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner = slot.clone();
        let subscription = bus.subscribe(Topic::Deployments, move |_| {
            if let Some(sub) = inner.lock().expect("slot lock").take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().expect("slot lock") = Some(subscription);

        bus.publish(&FleetSnapshot::Deployments(Vec::new()));
        assert_eq!(bus.subscriber_count(Topic::Deployments), 0);
    }

    #[test]
    fn failure_queue_drops_oldest_when_full() {
        let mut queue = DeliveryFailureQueue::new(2);
        for id in 1..=3 {
            queue.push(DeliveryFailure {
                topic: Topic::Deployments,
                subscriber_id: id,
                error: "boom".to_string(),
                at: Utc::now(),
            });
        }
        let ids = queue
            .entries()
            .iter()
            .map(|entry| entry.subscriber_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![2, 3]);

        let mut disabled = DeliveryFailureQueue::new(0);
        disabled.push(DeliveryFailure {
            topic: Topic::Metrics,
            subscriber_id: 1,
            error: "boom".to_string(),
            at: Utc::now(),
        });
        assert!(disabled.is_empty());
    }
}
