//! Synchronous fan-out of completed metrics.

use colloq_core::telemetry::Metric;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked for every published metric.
pub type Listener = Arc<dyn Fn(&Metric) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Subscribers are called in subscription order, on the publishing thread.
///
/// A listener that panics is logged and skipped; the remaining listeners
/// still receive the metric.
pub struct BroadcastChannel {
    listeners: Arc<Mutex<Listeners>>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Metric) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers `metric` to every current subscriber. Returns how many
    /// listeners completed without panicking.
    pub fn publish(&self, metric: &Metric) -> usize {
        // Snapshot so listeners may subscribe or unsubscribe re-entrantly.
        let snapshot: Vec<(u64, Listener)> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.clone()
        };

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(metric))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        "[BroadcastChannel] listener {} panicked on {}: {}",
                        id,
                        metric.operation,
                        reason
                    );
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle for one registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Removes the listener. Returns false if the channel is gone or the
    /// listener was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        before != listeners.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloq_core::telemetry::{Details, MemorySnapshot, MetricCategory};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn metric() -> Metric {
        Metric {
            timestamp: 0,
            duration_ms: 1.0,
            operation: "op".to_string(),
            category: MetricCategory::Ui,
            details: Details::new(),
            memory: MemorySnapshot::zeroed(),
            cadence_fps: 0.0,
            simulated_latency_ms: None,
        }
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let channel = BroadcastChannel::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            let _ = channel.subscribe(move |_| order.lock().unwrap().push(n));
        }

        assert_eq!(channel.publish(&metric()), 3);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_panicking_listener_does_not_starve_others() {
        let channel = BroadcastChannel::new();
        let received = Arc::new(AtomicUsize::new(0));

        let _ = channel.subscribe(|_| panic!("faulty subscriber"));
        let counter = received.clone();
        let _ = channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(channel.publish(&metric()), 1);
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let channel = BroadcastChannel::new();
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let subscription = channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.publish(&metric());
        assert!(subscription.unsubscribe());
        channel.publish(&metric());

        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_after_channel_dropped() {
        let channel = BroadcastChannel::new();
        let subscription = channel.subscribe(|_| {});
        drop(channel);
        assert!(!subscription.unsubscribe());
    }
}
