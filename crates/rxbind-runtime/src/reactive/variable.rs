#![forbid(unsafe_code)]

//! Mutable cell with behavior-stream semantics.
//!
//! A [`Variable<T>`] owns a current value and republishes every write.
//! [`Variable::observe`] replays the current value to each new subscriber,
//! then every later [`set`](Variable::set).
//!
//! # Invariants
//!
//! 1. [`get`](Variable::get) returns the value of the most recently
//!    completed `set`, whether or not anyone is subscribed.
//! 2. `set` stores the value first and publishes it second, both before it
//!    returns.
//! 3. After [`dispose`](Variable::dispose) (or drop) the stream is completed.
//!    `set` keeps updating the stored value but publishes nothing.
//!
//! # Concurrency
//!
//! Reads are lock-free from any thread. Writes are expected to come from one
//! serialized context (conventionally the UI context). Concurrent writers
//! stay memory-safe, but the order in which their values reach subscribers
//! is unspecified.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use tracing::trace;

use super::stream::Stream;
use super::subject::Subject;

/// Observable mutable cell.
pub struct Variable<T> {
    value: ArcSwap<T>,
    version: AtomicU64,
    subject: Subject<T>,
}

impl<T: Clone + Send + Sync + 'static> Variable<T> {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            value: ArcSwap::from_pointee(initial.clone()),
            version: AtomicU64::new(0),
            subject: Subject::behavior(initial),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        (**self.value.load()).clone()
    }

    /// Borrow the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.load())
    }

    /// Store `value`, then publish it to every subscriber.
    pub fn set(&self, value: T) {
        self.value.store(Arc::new(value.clone()));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(version, "variable set");
        self.subject.next(value);
    }

    /// Replace the value with `f(&current)` and publish the result.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Stream of the current value followed by every later write.
    #[must_use]
    pub fn observe(&self) -> Stream<T> {
        self.subject.as_stream()
    }

    /// Alias of [`observe`](Self::observe).
    #[must_use]
    pub fn as_stream(&self) -> Stream<T> {
        self.observe()
    }
}

impl<T> Variable<T> {
    /// Number of `set` calls so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Complete the stream. Idempotent.
    pub fn dispose(&self) {
        self.subject.complete();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.subject.is_terminated()
    }
}

impl<T: fmt::Debug> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("value", &**self.value.load())
            .field("version", &self.version())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T> Drop for Variable<T> {
    fn drop(&mut self) {
        self.subject.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, Recorder};

    #[test]
    fn get_without_subscribers() {
        let var = Variable::new(1);
        var.set(2);
        assert_eq!(var.get(), 2);
        assert_eq!(var.version(), 1);
    }

    #[test]
    fn observe_replays_current_then_writes() {
        let var = Variable::new("a".to_string());
        let rec = Recorder::new();
        let _sub = var.observe().subscribe(rec.clone());
        var.set("b".into());
        var.set("c".into());
        assert_eq!(rec.values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn scenario_two_subscribers() {
        let var = Variable::new(0);
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let a_log = Arc::clone(&log);
        let _a = var.observe().subscribe_next(move |v| a_log.lock().unwrap().push(('A', v)));
        var.set(5);

        let b_log = Arc::clone(&log);
        let _b = var.observe().subscribe_next(move |v| b_log.lock().unwrap().push(('B', v)));
        var.set(7);

        assert_eq!(
            *log.lock().unwrap(),
            vec![('A', 0), ('A', 5), ('B', 5), ('A', 7), ('B', 7)]
        );
    }

    #[test]
    fn value_is_stored_before_publish() {
        let var = Arc::new(Variable::new(0));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let v = Arc::clone(&var);
        let s = Arc::clone(&seen);
        let _sub = var.observe().subscribe_next(move |pushed| {
            s.lock().unwrap().push((pushed, v.get()));
        });
        var.set(3);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 0), (3, 3)]);
    }

    #[test]
    fn update_applies_function() {
        let var = Variable::new(10);
        var.update(|v| v + 1);
        var.update(|v| v * 2);
        assert_eq!(var.get(), 22);
        assert_eq!(var.version(), 2);
        assert!(var.with(|v| *v > 20));
    }

    #[test]
    fn dispose_completes_and_stops_publishing() {
        let var = Variable::new(1);
        let rec = Recorder::new();
        let _sub = var.observe().subscribe(rec.clone());
        var.dispose();
        var.dispose();
        var.set(2);
        assert_eq!(rec.events(), vec![Event::Next(1), Event::Completed]);
        assert_eq!(var.get(), 2);
        assert!(var.is_disposed());
    }

    #[test]
    fn subscribe_after_dispose_only_completes() {
        let var = Variable::new(1);
        var.dispose();
        let rec = Recorder::new();
        let _sub = var.observe().subscribe(rec.clone());
        assert_eq!(rec.events(), vec![Event::Completed]);
    }

    #[test]
    fn drop_completes_stream() {
        let var = Variable::new(1);
        let rec = Recorder::new();
        let _sub = var.as_stream().subscribe(rec.clone());
        drop(var);
        assert!(rec.is_completed());
    }

    #[test]
    fn reads_from_other_threads() {
        let var = Arc::new(Variable::new(vec![1, 2, 3]));
        var.set(vec![4]);
        let reader = Arc::clone(&var);
        let seen = std::thread::spawn(move || reader.get()).join().unwrap();
        assert_eq!(seen, vec![4]);
    }

    #[test]
    fn debug_format() {
        let var = Variable::new(4);
        let dbg = format!("{var:?}");
        assert!(dbg.contains("value: 4"));
        assert!(dbg.contains("version: 0"));
    }
}
