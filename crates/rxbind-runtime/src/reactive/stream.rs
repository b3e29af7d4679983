#![forbid(unsafe_code)]

//! Cold push streams and the observer contract.
//!
//! [`Stream<T>`] is the minimal substrate the binding layer is built on: a
//! stream is a subscribe function, and every subscriber gets its own
//! upstream subscription. Only the operators the binding primitives need are
//! provided.
//!
//! # Invariants
//!
//! Upstreams must signal each observer serially: no two calls on the same
//! observer overlap. [`Subject`](super::Subject) honours this per observer
//! when its producers are serialized. Given that:
//!
//! 1. After `on_error` or `on_completed`, no further signal reaches the
//!    observer, and the upstream subscription is released.
//! 2. After the returned [`Subscription`] is cancelled, no further signal
//!    reaches the observer.
//! 3. Values are forwarded in the order the upstream produced them.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use tracing::{error, trace};

use super::error::StreamError;
use super::subscription::{Subscription, SubscriptionSlot};
use crate::dispatch::DispatcherRef;
use crate::marshal::Marshaler;

/// Name given to the worker threads spawned by [`Stream::run_in_background`].
pub const WORKER_THREAD_NAME: &str = "rxbind-worker";

/// Receiver of stream signals.
pub trait Observer<T>: Send + Sync {
    /// A value was produced.
    fn on_next(&self, value: T);
    /// The stream failed. Terminal.
    fn on_error(&self, error: StreamError);
    /// The stream finished. Terminal.
    fn on_completed(&self);
}

/// Type-erased, shareable observer.
pub type SharedObserver<T> = Arc<dyn Observer<T>>;

impl<T, O: Observer<T> + ?Sized> Observer<T> for Arc<O> {
    fn on_next(&self, value: T) {
        (**self).on_next(value);
    }

    fn on_error(&self, error: StreamError) {
        (**self).on_error(error);
    }

    fn on_completed(&self) {
        (**self).on_completed();
    }
}

type NextFn<T> = Box<dyn Fn(T) + Send + Sync>;
type ErrorFn = Box<dyn Fn(StreamError) + Send + Sync>;
type CompletedFn = Box<dyn Fn() + Send + Sync>;

/// Observer assembled from closures.
///
/// Without an error handler, errors are logged at `error` level and dropped.
pub struct CallbackObserver<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    completed: Option<CompletedFn>,
}

impl<T> CallbackObserver<T> {
    pub fn new(next: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            next: Box::new(next),
            error: None,
            completed: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, f: impl Fn(StreamError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn with_completed(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.completed = Some(Box::new(f));
        self
    }
}

impl<T> Observer<T> for CallbackObserver<T> {
    fn on_next(&self, value: T) {
        (self.next)(value);
    }

    fn on_error(&self, err: StreamError) {
        match &self.error {
            Some(f) => f(err),
            None => error!(error = %err, "unhandled stream error"),
        }
    }

    fn on_completed(&self) {
        if let Some(f) = &self.completed {
            f();
        }
    }
}

impl<T> fmt::Debug for CallbackObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("handles_error", &self.error.is_some())
            .field("handles_completed", &self.completed.is_some())
            .finish()
    }
}

/// Shorthand for [`CallbackObserver::new`].
pub fn observer_fn<T>(next: impl Fn(T) + Send + Sync + 'static) -> CallbackObserver<T> {
    CallbackObserver::new(next)
}

/// Enforces the terminal and cancellation rules for one subscriber.
///
/// The `stopped` check is not atomic with delivery, so an `on_next` racing
/// a terminal from another thread may still get through. Upstreams are
/// required to signal serially.
struct Guarded<T, O> {
    observer: O,
    stopped: Arc<AtomicBool>,
    upstream: SubscriptionSlot,
    _marker: PhantomData<fn(T)>,
}

impl<T, O: Observer<T>> Observer<T> for Guarded<T, O> {
    fn on_next(&self, value: T) {
        if !self.stopped.load(Ordering::Acquire) {
            self.observer.on_next(value);
        }
    }

    fn on_error(&self, error: StreamError) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.observer.on_error(error);
            self.upstream.cancel();
        }
    }

    fn on_completed(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.observer.on_completed();
            self.upstream.cancel();
        }
    }
}

/// Forwards terminals unchanged and routes values through `next`.
struct Relay<T, U> {
    downstream: SharedObserver<U>,
    next: Box<dyn Fn(&SharedObserver<U>, T) + Send + Sync>,
}

impl<T, U> Relay<T, U> {
    fn new(
        downstream: SharedObserver<U>,
        next: impl Fn(&SharedObserver<U>, T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            downstream,
            next: Box::new(next),
        }
    }
}

impl<T, U> Observer<T> for Relay<T, U> {
    fn on_next(&self, value: T) {
        (self.next)(&self.downstream, value);
    }

    fn on_error(&self, error: StreamError) {
        self.downstream.on_error(error);
    }

    fn on_completed(&self) {
        self.downstream.on_completed();
    }
}

/// Re-delivers every signal through a [`Marshaler`].
struct ObserveOn<T> {
    downstream: SharedObserver<T>,
    marshaler: Marshaler,
}

impl<T: Send + 'static> Observer<T> for ObserveOn<T> {
    fn on_next(&self, value: T) {
        let downstream = Arc::clone(&self.downstream);
        self.marshaler.run(move || downstream.on_next(value));
    }

    fn on_error(&self, error: StreamError) {
        let downstream = Arc::clone(&self.downstream);
        self.marshaler.run(move || downstream.on_error(error));
    }

    fn on_completed(&self) {
        let downstream = Arc::clone(&self.downstream);
        self.marshaler.run(move || downstream.on_completed());
    }
}

type SubscribeFn<T> = dyn Fn(SharedObserver<T>) -> Subscription + Send + Sync;

/// A cold stream of `T`.
///
/// Cloning shares the subscribe function; each `subscribe` call runs it
/// again for the new observer.
pub struct Stream<T> {
    subscribe_fn: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Stream<T> {
    /// Create a stream from its subscribe function.
    ///
    /// The function receives the subscriber and returns the handle that
    /// releases whatever it attached.
    pub fn new(
        subscribe: impl Fn(SharedObserver<T>) -> Subscription + Send + Sync + 'static,
    ) -> Self {
        Self {
            subscribe_fn: Arc::new(subscribe),
        }
    }

    /// A stream that completes immediately.
    pub fn empty() -> Self {
        Self::new(|observer| {
            observer.on_completed();
            Subscription::empty()
        })
    }

    /// A stream that fails immediately with `error`.
    pub fn fail(error: StreamError) -> Self {
        Self::new(move |observer| {
            observer.on_error(error.clone());
            Subscription::empty()
        })
    }

    /// Attach an observer.
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        let stopped = Arc::new(AtomicBool::new(false));
        let upstream = SubscriptionSlot::new();
        let guarded: SharedObserver<T> = Arc::new(Guarded {
            observer,
            stopped: Arc::clone(&stopped),
            upstream: upstream.clone(),
            _marker: PhantomData,
        });
        upstream.set((self.subscribe_fn)(guarded));
        Subscription::new(move || {
            stopped.store(true, Ordering::Release);
            upstream.cancel();
        })
    }

    /// Attach a value callback. Errors are logged, completion is ignored.
    pub fn subscribe_next(&self, next: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        self.subscribe(CallbackObserver::new(next))
    }

    /// Feed this stream into `observer`, typically a binding sink.
    pub fn bind_to(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.subscribe(observer)
    }

    /// Transform every value.
    pub fn map<U: Send + 'static>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Stream<U> {
        let source = self.clone();
        let f = Arc::new(f);
        Stream::new(move |downstream: SharedObserver<U>| {
            let f = Arc::clone(&f);
            source.subscribe(Relay::new(downstream, move |d, value| d.on_next(f(value))))
        })
    }

    /// Keep only the values matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Stream<T> {
        let source = self.clone();
        let predicate = Arc::new(predicate);
        Stream::new(move |downstream: SharedObserver<T>| {
            let predicate = Arc::clone(&predicate);
            source.subscribe(Relay::new(downstream, move |d, value| {
                if predicate(&value) {
                    d.on_next(value);
                }
            }))
        })
    }

    /// Drop the first `count` values of each subscription.
    pub fn skip(&self, count: usize) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |downstream: SharedObserver<T>| {
            let remaining = AtomicUsize::new(count);
            source.subscribe(Relay::new(downstream, move |d, value| {
                let skipped = remaining
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| r.checked_sub(1))
                    .is_ok();
                if !skipped {
                    d.on_next(value);
                }
            }))
        })
    }

    /// Complete as soon as `notifier` produces a value.
    ///
    /// A notifier error is forwarded; a notifier that completes without a
    /// value leaves this stream running.
    pub fn take_until<U: Send + 'static>(&self, notifier: &Stream<U>) -> Stream<T> {
        let source = self.clone();
        let notifier = notifier.clone();
        Stream::new(move |downstream: SharedObserver<T>| {
            let fired = Arc::new(AtomicBool::new(false));
            let on_signal = {
                let downstream = Arc::clone(&downstream);
                let fired = Arc::clone(&fired);
                move |_: U| {
                    fired.store(true, Ordering::Release);
                    downstream.on_completed();
                }
            };
            let on_failure = {
                let downstream = Arc::clone(&downstream);
                let fired = Arc::clone(&fired);
                move |err: StreamError| {
                    fired.store(true, Ordering::Release);
                    downstream.on_error(err);
                }
            };
            let notifier_sub =
                notifier.subscribe(CallbackObserver::new(on_signal).with_error(on_failure));
            if fired.load(Ordering::Acquire) {
                notifier_sub.cancel();
                return Subscription::empty();
            }
            let source_sub = source.subscribe(downstream);
            Subscription::new(move || {
                notifier_sub.cancel();
                source_sub.cancel();
            })
        })
    }

    /// Deliver every signal on `dispatcher`'s context.
    pub fn observe_on(&self, dispatcher: DispatcherRef) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |downstream: SharedObserver<T>| {
            source.subscribe(ObserveOn {
                downstream,
                marshaler: Marshaler::new(Arc::clone(&dispatcher)),
            })
        })
    }

    /// Attach to (and later detach from) the upstream on `dispatcher`'s
    /// context.
    ///
    /// Off-context the returned handle is live before the upstream is
    /// attached; cancelling it early means the upstream is never attached.
    /// Once the dispatcher has stopped, cancelling detaches on the calling
    /// thread.
    pub fn subscribe_on(&self, dispatcher: DispatcherRef) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |downstream: SharedObserver<T>| {
            let marshaler = Marshaler::new(Arc::clone(&dispatcher));
            let slot = SubscriptionSlot::new();
            let pending = slot.clone();
            let source = source.clone();
            marshaler.run(move || {
                if pending.is_cancelled() {
                    trace!("subscribe_on: cancelled before attach");
                    return;
                }
                pending.set(source.subscribe(downstream));
            });
            Subscription::new(move || {
                marshaler.run_or_inline(move || slot.cancel());
            })
        })
    }

    /// Attach to the upstream on a freshly spawned worker thread and deliver
    /// on `dispatcher`'s context.
    ///
    /// If the worker cannot be spawned the subscriber receives the spawn
    /// error.
    pub fn run_in_background(&self, dispatcher: DispatcherRef) -> Stream<T> {
        self.subscribe_on_worker().observe_on(dispatcher)
    }

    fn subscribe_on_worker(&self) -> Stream<T> {
        let source = self.clone();
        Stream::new(move |downstream: SharedObserver<T>| {
            let slot = SubscriptionSlot::new();
            let pending = slot.clone();
            let source = source.clone();
            let failed = Arc::clone(&downstream);
            let spawned = thread::Builder::new()
                .name(WORKER_THREAD_NAME.into())
                .spawn(move || {
                    if !pending.is_cancelled() {
                        pending.set(source.subscribe(downstream));
                    }
                });
            if let Err(err) = spawned {
                failed.on_error(StreamError::new(err));
            }
            Subscription::new(move || slot.cancel())
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Stream<T> {
    /// A stream that emits `value` and completes.
    pub fn just(value: T) -> Self {
        Self::new(move |observer| {
            observer.on_next(value.clone());
            observer.on_completed();
            Subscription::empty()
        })
    }

    /// A stream that emits each of `values` in order and completes.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let values: Arc<[T]> = values.into_iter().collect();
        Self::new(move |observer| {
            for value in values.iter() {
                observer.on_next(value.clone());
            }
            observer.on_completed();
            Subscription::empty()
        })
    }
}
