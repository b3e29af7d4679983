#![forbid(unsafe_code)]

//! Cancellable subscription handles.
//!
//! A [`Subscription`] is the handle returned by every `subscribe` call in
//! this crate. Cancelling it detaches the downstream observer and releases
//! the upstream resources.
//!
//! # Invariants
//!
//! 1. The release action runs at most once, no matter how many clones of the
//!    handle call [`Subscription::cancel`], or from which threads.
//! 2. Clones share identity: [`Subscription::ptr_eq`] is true between a
//!    handle and all of its clones, and false otherwise.
//! 3. Dropping a handle does **not** cancel it. Lifetime is owned explicitly,
//!    typically by a [`SubscriptionBag`](super::SubscriptionBag).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::sync::lock;

type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

struct SubscriptionInner {
    cancelled: AtomicBool,
    release: Mutex<Option<ReleaseFn>>,
}

/// Handle to an active subscription.
#[derive(Clone)]
#[must_use = "dropping a Subscription does not cancel it; cancel it or add it to a SubscriptionBag"]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    /// Create a handle that runs `release` on first cancellation.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                cancelled: AtomicBool::new(false),
                release: Mutex::new(Some(Box::new(release))),
            }),
        }
    }

    /// Create a handle with nothing to release.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                cancelled: AtomicBool::new(false),
                release: Mutex::new(None),
            }),
        }
    }

    /// Cancel the subscription. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Take the closure out before running it so the lock is not held
        // while upstream teardown code executes.
        let release = lock(&self.inner.release).take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on this handle or a clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Hand ownership of this subscription to `bag`.
    pub fn dispose_by(self, bag: &super::SubscriptionBag) {
        bag.add(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

enum SlotState {
    Empty,
    Held(Subscription),
    Cancelled,
}

/// A cell for an upstream subscription that may be established after the
/// downstream handle has already been handed out.
///
/// If the slot is cancelled first, the subscription stored later is
/// cancelled on arrival.
#[derive(Clone)]
pub(crate) struct SubscriptionSlot {
    state: Arc<Mutex<SlotState>>,
}

impl SubscriptionSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState::Empty)),
        }
    }

    pub(crate) fn set(&self, subscription: Subscription) {
        let mut state = lock(&self.state);
        if matches!(*state, SlotState::Cancelled) {
            drop(state);
            subscription.cancel();
            return;
        }
        *state = SlotState::Held(subscription);
    }

    pub(crate) fn cancel(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), SlotState::Cancelled);
        if let SlotState::Held(subscription) = previous {
            subscription.cancel();
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*lock(&self.state), SlotState::Cancelled)
    }
}
