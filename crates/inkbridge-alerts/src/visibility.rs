//! Foreground/background tracking for the application window.
//!
//! The host reports transitions through [`VisibilityTracker::set_visible`];
//! subscribers are called synchronously, in registration order, with the
//! new value.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

pub struct VisibilityTracker {
    visible: AtomicBool,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback)>>,
}

impl VisibilityTracker {
    /// Capture the current visibility at construction.
    pub fn new(initially_visible: bool) -> Arc<Self> {
        Arc::new(Self {
            visible: AtomicBool::new(initially_visible),
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn is_page_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Register a callback. Each call returns its own independent handle.
    pub fn on_visibility_change<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push((id, Arc::new(callback)));
        }
        Subscription {
            id,
            tracker: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    /// Host visibility signal. A value equal to the current one is not a
    /// transition and notifies nobody.
    pub fn set_visible(&self, visible: bool) {
        if self.visible.swap(visible, Ordering::SeqCst) == visible {
            return;
        }
        tracing::debug!(visible, "Page visibility changed");

        // Snapshot so callbacks may subscribe or unsubscribe re-entrantly.
        let callbacks: Vec<(u64, Callback)> = match self.subscribers.lock() {
            Ok(subs) => subs.clone(),
            Err(_) => {
                tracing::error!("Visibility subscriber list poisoned");
                return;
            }
        };
        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(visible))).is_err() {
                tracing::error!(subscription = id, "Visibility callback panicked");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn remove(&self, id: u64) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// Handle returned by [`VisibilityTracker::on_visibility_change`].
///
/// Unsubscribing is idempotent and also happens on drop.
pub struct Subscription {
    id: u64,
    tracker: Weak<VisibilityTracker>,
    active: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn captures_initial_state() {
        assert!(VisibilityTracker::new(true).is_page_visible());
        assert!(!VisibilityTracker::new(false).is_page_visible());
    }

    #[test]
    fn transition_notifies_every_subscriber() {
        let tracker = VisibilityTracker::new(true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = {
            let seen = seen.clone();
            tracker.on_visibility_change(move |v| seen.lock().unwrap().push(("a", v)))
        };
        let b = {
            let seen = seen.clone();
            tracker.on_visibility_change(move |v| seen.lock().unwrap().push(("b", v)))
        };

        tracker.set_visible(false);
        assert!(!tracker.is_page_visible());
        assert_eq!(*seen.lock().unwrap(), vec![("a", false), ("b", false)]);
        drop((a, b));
    }

    #[test]
    fn same_value_is_not_a_transition() {
        let tracker = VisibilityTracker::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _sub = tracker.on_visibility_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        tracker.set_visible(true);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_callback_does_not_stop_others() {
        let tracker = VisibilityTracker::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let _bad = tracker.on_visibility_change(|_| panic!("boom"));
        let c = calls.clone();
        let _good = tracker.on_visibility_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tracker.set_visible(false);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!tracker.is_page_visible());

        tracker.set_visible(true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_twice_is_harmless() {
        let tracker = VisibilityTracker::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sub = tracker.on_visibility_change(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(tracker.subscriber_count(), 0);

        tracker.set_visible(false);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscriptions_are_independent() {
        let tracker = VisibilityTracker::new(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let first = tracker.on_visibility_change(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = calls.clone();
        let _second = tracker.on_visibility_change(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        first.unsubscribe();
        tracker.set_visible(false);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn dropping_handle_unsubscribes() {
        let tracker = VisibilityTracker::new(true);
        {
            let _sub = tracker.on_visibility_change(|_| {});
            assert_eq!(tracker.subscriber_count(), 1);
        }
        assert_eq!(tracker.subscriber_count(), 0);
    }
}
