//! Notification fan-out.
//!
//! Keeps the insertion-ordered set of reload subscribers and delivers one
//! [`ReloadSignal`] to each on [`FanOut::notify`]. Delivery is best effort:
//! a failed send is counted and skipped, and never removes the subscriber.
//! Removal belongs to whoever holds the [`Subscription`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::Result;
use crossbeam::channel::Sender;
use parking_lot::Mutex;

use super::{Notify, ReloadSignal};

/// A send-capable reload endpoint.
pub trait Subscriber: Send + Sync {
    fn deliver(&self, signal: ReloadSignal) -> Result<()>;
}

impl Subscriber for Sender<ReloadSignal> {
    fn deliver(&self, signal: ReloadSignal) -> Result<()> {
        self.send(signal)
            .map_err(|_| anyhow::anyhow!("reload connection closed"))
    }
}

type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Arc<dyn Subscriber>)>,
}

impl Registry {
    fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }
}

/// Result of one [`FanOut::notify`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Shared subscriber set. Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct FanOut {
    registry: Arc<Mutex<Registry>>,
    seq: Arc<AtomicU64>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Dropping or unsubscribing the returned token
    /// removes exactly this subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, subscriber));
        crate::debug!("reload"; "subscribed #{} (total: {})", id, registry.subscribers.len());

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active: AtomicBool::new(true),
        }
    }

    /// Send a reload signal to every subscriber registered right now.
    ///
    /// The set is snapshotted under the lock and sends happen outside it, so a
    /// slow subscriber never blocks subscribe/unsubscribe.
    pub fn notify(&self) -> Delivery {
        let snapshot: Vec<Arc<dyn Subscriber>> = self
            .registry
            .lock()
            .subscribers
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        let signal = ReloadSignal {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut delivery = Delivery::default();
        for subscriber in snapshot {
            match subscriber.deliver(signal) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    crate::debug!("reload"; "send #{} failed: {}", signal.seq, e);
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    pub fn len(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notify for FanOut {
    fn notify(&self) {
        let delivery = FanOut::notify(self);
        match (delivery.delivered, delivery.failed) {
            (0, 0) => crate::logger::status_success("changed, no browser connected"),
            (n, 0) => crate::logger::status_success(&format!(
                "reloaded {} {}",
                n,
                if n == 1 { "client" } else { "clients" }
            )),
            (n, failed) => crate::logger::status_error(
                &format!("reloaded {n}, {failed} failed"),
                "",
            ),
        }
    }
}

/// Capability to remove one subscriber. Idempotent; also runs on drop.
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<Mutex<Registry>>,
    active: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.lock();
        if registry.remove(self.id) {
            crate::debug!("reload"; "unsubscribed #{} (total: {})", self.id, registry.subscribers.len());
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
