#![forbid(unsafe_code)]

//! Subscription lifetime container.
//!
//! A [`SubscriptionBag`] belongs to an owner (typically a view controller)
//! and holds every subscription created on its behalf. When the owner ends,
//! [`release_all`](SubscriptionBag::release_all) cancels them all; dropping
//! the bag does the same.
//!
//! # Usage
//!
//! ```
//! use rxbind_runtime::reactive::{SubscriptionBag, Variable};
//!
//! let bag = SubscriptionBag::new();
//! let count = Variable::new(0);
//!
//! bag.subscribe(&count.observe(), |v| println!("count = {v}"));
//! count.observe().subscribe_next(|_| {}).dispose_by(&bag);
//! assert_eq!(bag.len(), 2);
//!
//! bag.release_all();
//! assert!(bag.is_released());
//! ```
//!
//! # Invariants
//!
//! 1. Membership is by identity: adding the same handle (or a clone of it)
//!    twice stores it once.
//! 2. Each stored handle is cancelled exactly once, newest first.
//! 3. `release_all` is idempotent. Handles added after it are cancelled on
//!    arrival, so a released bag never holds a live subscription.
//! 4. [`clear`](SubscriptionBag::clear) cancels the current entries but
//!    leaves the bag usable.

use std::fmt;
use std::sync::Mutex;

use tracing::debug;

use super::stream::Stream;
use super::subscription::Subscription;
use crate::sync::lock;

struct BagState {
    entries: Vec<Subscription>,
    released: bool,
}

/// Owner-scoped set of subscriptions.
pub struct SubscriptionBag {
    state: Mutex<BagState>,
}

impl SubscriptionBag {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BagState {
                entries: Vec::new(),
                released: false,
            }),
        }
    }

    /// Store `subscription`. Returns whether it was stored.
    ///
    /// `None` and already-present handles are ignored. After
    /// [`release_all`](Self::release_all) the handle is cancelled instead.
    pub fn add(&self, subscription: impl Into<Option<Subscription>>) -> bool {
        let Some(subscription) = subscription.into() else {
            return false;
        };
        let mut state = lock(&self.state);
        if state.released {
            drop(state);
            debug!("subscription added to released bag; cancelling");
            subscription.cancel();
            return false;
        }
        if state.entries.iter().any(|s| s.ptr_eq(&subscription)) {
            return false;
        }
        state.entries.push(subscription);
        true
    }

    /// Subscribe `callback` to `source` and keep the subscription in this bag.
    ///
    /// Returns the bag for chaining.
    pub fn subscribe<T: Send + 'static>(
        &self,
        source: &Stream<T>,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> &Self {
        self.add(source.subscribe_next(callback));
        self
    }

    /// Cancel every stored subscription and refuse live entries from now on.
    /// Idempotent.
    pub fn release_all(&self) {
        let entries = {
            let mut state = lock(&self.state);
            if state.released {
                return;
            }
            state.released = true;
            std::mem::take(&mut state.entries)
        };
        debug!(count = entries.len(), "releasing subscription bag");
        cancel_newest_first(entries);
    }

    /// Cancel the current entries. The bag stays usable.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut lock(&self.state).entries);
        cancel_newest_first(entries);
    }

    /// Number of stored subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        lock(&self.state).released
    }
}

fn cancel_newest_first(entries: Vec<Subscription>) {
    for subscription in entries.into_iter().rev() {
        subscription.cancel();
    }
}

impl Default for SubscriptionBag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SubscriptionBag")
            .field("binding_count", &state.entries.len())
            .field("released", &state.released)
            .finish()
    }
}

impl Drop for SubscriptionBag {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Subject;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting() -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (sub, count)
    }

    #[test]
    fn duplicate_add_cancels_once() {
        let bag = SubscriptionBag::new();
        let (sub, count) = counting();
        assert!(bag.add(sub.clone()));
        assert!(!bag.add(sub.clone()));
        assert_eq!(bag.len(), 1);
        bag.release_all();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn none_is_ignored() {
        let bag = SubscriptionBag::new();
        assert!(!bag.add(None::<Subscription>));
        assert!(bag.is_empty());
    }

    #[test]
    fn release_all_twice_is_safe() {
        let bag = SubscriptionBag::new();
        let (a, a_count) = counting();
        let (b, b_count) = counting();
        bag.add(a);
        bag.add(b);
        bag.release_all();
        bag.release_all();
        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert_eq!(b_count.load(Ordering::SeqCst), 1);
        assert!(bag.is_empty());
        assert!(bag.is_released());
    }

    #[test]
    fn releases_newest_first() {
        let bag = SubscriptionBag::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            bag.add(Subscription::new(move || order.lock().unwrap().push(n)));
        }
        bag.release_all();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn add_after_release_cancels_immediately() {
        let bag = SubscriptionBag::new();
        bag.release_all();
        let (sub, count) = counting();
        assert!(!bag.add(sub.clone()));
        assert!(sub.is_cancelled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(bag.is_empty());
    }

    #[test]
    fn drop_releases() {
        let (sub, count) = counting();
        {
            let bag = SubscriptionBag::new();
            sub.clone().dispose_by(&bag);
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(sub.is_cancelled());
    }

    #[test]
    fn clear_keeps_bag_usable() {
        let bag = SubscriptionBag::new();
        let (a, a_count) = counting();
        bag.add(a);
        bag.clear();
        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert!(!bag.is_released());

        let (b, b_count) = counting();
        assert!(bag.add(b));
        assert_eq!(b_count.load(Ordering::SeqCst), 0);
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn subscribe_holds_until_release() {
        let subject = Subject::publish();
        let seen = Arc::new(AtomicUsize::new(0));
        let bag = SubscriptionBag::new();
        let s = Arc::clone(&seen);
        bag.subscribe(&subject.as_stream(), move |v: usize| {
            s.fetch_add(v, Ordering::SeqCst);
        })
        .subscribe(&subject.as_stream(), |_| {});
        assert_eq!(bag.len(), 2);

        subject.next(2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        bag.release_all();
        subject.next(5);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn debug_format() {
        let bag = SubscriptionBag::default();
        bag.add(Subscription::empty());
        assert_eq!(
            format!("{bag:?}"),
            "SubscriptionBag { binding_count: 1, released: false }"
        );
    }
}
