//! Latest-value broadcast channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::trace;
use parking_lot::Mutex;

struct TopicInner<T> {
    name: &'static str,
    latest: ArcSwap<T>,
    subscribers: Mutex<Vec<(u64, Sender<Arc<T>>)>>,
    next_id: AtomicU64,
}

/// A state facet that remembers its latest value and fans updates out to
/// subscribers.
///
/// New subscribers receive the current value first, then every later
/// publish in order.
pub struct Topic<T> {
    inner: Arc<TopicInner<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(name: &'static str, initial: T) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                name,
                latest: ArcSwap::from_pointee(initial),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Current value without subscribing.
    pub fn get(&self) -> Arc<T> {
        self.inner.latest.load_full()
    }

    /// Stores `value` and delivers it to every live subscriber.
    ///
    /// Returns how many subscribers received it.
    pub fn publish(&self, value: T) -> usize {
        let value = Arc::new(value);
        let mut subscribers = self.inner.subscribers.lock();
        self.inner.latest.store(Arc::clone(&value));
        subscribers.retain(|(_, tx)| tx.send(Arc::clone(&value)).is_ok());
        trace!(
            "topic.publish name={} subscribers={}",
            self.inner.name,
            subscribers.len()
        );
        subscribers.len()
    }

    /// Registers a subscriber primed with the current value.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.inner.subscribers.lock();
        // Primed under the lock so no publish can slip between the two.
        let _ = tx.send(self.inner.latest.load_full());
        subscribers.push((id, tx));
        Subscription {
            id,
            rx,
            topic: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl<T: PartialEq + Send + Sync + 'static> Topic<T> {
    /// Publishes only when `value` differs from the current one.
    pub fn publish_if_changed(&self, value: T) -> bool {
        if *self.get() == value {
            return false;
        }
        self.publish(value);
        true
    }
}

/// Receiving end of a [`Topic`]. Dropping it unsubscribes.
pub struct Subscription<T> {
    id: u64,
    rx: Receiver<Arc<T>>,
    topic: Weak<TopicInner<T>>,
}

impl<T> Subscription<T> {
    /// Next queued value, if any.
    pub fn try_recv(&self) -> Option<Arc<T>> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Arc<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every queued value, oldest first.
    pub fn drain(&self) -> Vec<Arc<T>> {
        self.rx.try_iter().collect()
    }

    /// Newest queued value, discarding the ones before it.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.rx.try_iter().last()
    }

    /// Stops delivery. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(topic) = self.topic.upgrade() {
            topic.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
