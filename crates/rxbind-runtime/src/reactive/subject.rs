#![forbid(unsafe_code)]

//! Hot multicast subjects.
//!
//! A [`Subject<T>`] is both an [`Observer`] (signals pushed into it) and a
//! source of [`Stream`]s (signals broadcast to every attached observer).
//! What a late subscriber sees first depends on the [`ReplayMode`]:
//!
//! | Mode         | Live subject replays | After completion replays |
//! |--------------|----------------------|--------------------------|
//! | `None`       | nothing              | terminal only            |
//! | `Latest`     | most recent value    | terminal only            |
//! | `Last(n)`    | last `n` values      | last `n` values + terminal |
//!
//! # Invariants
//!
//! 1. Observers are notified in attach order.
//! 2. The internal lock is never held while an observer runs, so observers
//!    may push into the subject or attach new observers re-entrantly.
//! 3. After the first terminal signal, later signals are ignored.
//! 4. A new observer receives its whole replay before any live signal.
//!    Signals pushed while the replay is still being delivered, from any
//!    thread, are held in that observer's backlog and delivered after it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::error::StreamError;
use super::stream::{Observer, SharedObserver, Stream};
use super::subscription::Subscription;
use crate::sync::lock;

/// What a subject replays to new observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayMode {
    /// Publish semantics.
    None,
    /// Behavior semantics: the most recent value.
    Latest,
    /// Replay semantics: up to the last `n` values.
    Last(usize),
}

#[derive(Clone)]
enum Terminal {
    Completed,
    Failed(StreamError),
}

enum Signal<T> {
    Next(T),
    End(Terminal),
}

struct Entry<T> {
    id: u64,
    observer: SharedObserver<T>,
    /// `Some` until the observer's replay has been delivered.
    backlog: Option<VecDeque<Signal<T>>>,
}

struct SubjectState<T> {
    observers: Vec<Entry<T>>,
    next_id: u64,
    buffer: VecDeque<T>,
    terminal: Option<Terminal>,
}

struct SubjectInner<T> {
    mode: ReplayMode,
    state: Mutex<SubjectState<T>>,
}

impl<T> SubjectInner<T> {
    fn remove(&self, id: u64) {
        lock(&self.state).observers.retain(|entry| entry.id != id);
    }

    fn terminate(&self, terminal: Terminal) {
        let live = {
            let mut state = lock(&self.state);
            if state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal.clone());
            let mut live = Vec::new();
            for mut entry in std::mem::take(&mut state.observers) {
                match entry.backlog.as_mut() {
                    Some(backlog) => {
                        backlog.push_back(Signal::End(terminal.clone()));
                        state.observers.push(entry);
                    }
                    None => live.push(entry.observer),
                }
            }
            live
        };
        for observer in live {
            deliver_end(&*observer, &terminal);
        }
    }

    /// Deliver the signals queued for `id` while its replay ran, then mark
    /// it live. Returns once the backlog is empty under the lock.
    fn drain_backlog(&self, id: u64, observer: &SharedObserver<T>) {
        loop {
            let batch = {
                let mut state = lock(&self.state);
                let Some(pos) = state.observers.iter().position(|entry| entry.id == id) else {
                    return;
                };
                let entry = &mut state.observers[pos];
                let batch = entry.backlog.as_mut().map(std::mem::take).unwrap_or_default();
                if batch.is_empty() {
                    entry.backlog = None;
                    return;
                }
                if matches!(batch.back(), Some(Signal::End(_))) {
                    state.observers.remove(pos);
                }
                batch
            };
            for signal in batch {
                match signal {
                    Signal::Next(value) => observer.on_next(value),
                    Signal::End(terminal) => deliver_end(&**observer, &terminal),
                }
            }
        }
    }
}

fn deliver_end<T>(observer: &dyn Observer<T>, terminal: &Terminal) {
    match terminal {
        Terminal::Completed => observer.on_completed(),
        Terminal::Failed(err) => observer.on_error(err.clone()),
    }
}

/// Multicast observer/stream pair.
///
/// Cloning yields another handle to the same subject.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Subject")
            .field("mode", &self.inner.mode)
            .field("observer_count", &state.observers.len())
            .field("buffered", &state.buffer.len())
            .field("terminated", &state.terminal.is_some())
            .finish()
    }
}

impl<T> Subject<T> {
    fn with_mode(mode: ReplayMode, buffer: VecDeque<T>) -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                mode,
                state: Mutex::new(SubjectState {
                    observers: Vec::new(),
                    next_id: 0,
                    buffer,
                    terminal: None,
                }),
            }),
        }
    }

    /// A subject that replays nothing.
    #[must_use]
    pub fn publish() -> Self {
        Self::with_mode(ReplayMode::None, VecDeque::new())
    }

    /// A subject that replays the most recent value, seeded with `initial`.
    #[must_use]
    pub fn behavior(initial: T) -> Self {
        Self::with_mode(ReplayMode::Latest, VecDeque::from([initial]))
    }

    /// A subject that replays up to the last `capacity` values.
    #[must_use]
    pub fn replay(capacity: usize) -> Self {
        Self::with_mode(ReplayMode::Last(capacity), VecDeque::with_capacity(capacity))
    }

    #[must_use]
    pub fn mode(&self) -> ReplayMode {
        self.inner.mode
    }

    /// Number of attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.inner.state).observers.len()
    }

    /// Whether a terminal signal has been received.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        lock(&self.inner.state).terminal.is_some()
    }

    /// Complete the subject. Ignored if already terminated.
    pub fn complete(&self) {
        self.inner.terminate(Terminal::Completed);
    }

    /// Fail the subject. Ignored if already terminated.
    pub fn fail(&self, error: StreamError) {
        self.inner.terminate(Terminal::Failed(error));
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    /// Push a value to every attached observer. Ignored once terminated.
    pub fn next(&self, value: T) {
        let live: Vec<SharedObserver<T>> = {
            let mut state = lock(&self.inner.state);
            if state.terminal.is_some() {
                return;
            }
            match self.inner.mode {
                ReplayMode::None => {}
                ReplayMode::Latest => {
                    state.buffer.clear();
                    state.buffer.push_back(value.clone());
                }
                ReplayMode::Last(0) => {}
                ReplayMode::Last(capacity) => {
                    if state.buffer.len() == capacity {
                        state.buffer.pop_front();
                    }
                    state.buffer.push_back(value.clone());
                }
            }
            let mut live = Vec::with_capacity(state.observers.len());
            for entry in &mut state.observers {
                match entry.backlog.as_mut() {
                    Some(backlog) => backlog.push_back(Signal::Next(value.clone())),
                    None => live.push(Arc::clone(&entry.observer)),
                }
            }
            live
        };
        for observer in live {
            observer.on_next(value.clone());
        }
    }

    /// The replayed value of a behavior subject, or the newest buffered
    /// value of a replay subject.
    #[must_use]
    pub fn latest(&self) -> Option<T> {
        lock(&self.inner.state).buffer.back().cloned()
    }

    /// A stream view of this subject.
    #[must_use]
    pub fn as_stream(&self) -> Stream<T> {
        let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
        Stream::new(move |observer: SharedObserver<T>| {
            let Some(inner) = weak.upgrade() else {
                observer.on_completed();
                return Subscription::empty();
            };
            let (replay, terminal, id) = {
                let mut state = lock(&inner.state);
                let replays_after_end = matches!(inner.mode, ReplayMode::Last(_));
                let replay: Vec<T> = if state.terminal.is_none() || replays_after_end {
                    state.buffer.iter().cloned().collect()
                } else {
                    Vec::new()
                };
                let id = if state.terminal.is_none() {
                    let id = state.next_id;
                    state.next_id += 1;
                    state.observers.push(Entry {
                        id,
                        observer: Arc::clone(&observer),
                        backlog: Some(VecDeque::new()),
                    });
                    Some(id)
                } else {
                    None
                };
                (replay, state.terminal.clone(), id)
            };
            for value in replay {
                observer.on_next(value);
            }
            if let Some(terminal) = &terminal {
                deliver_end(&*observer, terminal);
            }
            match id {
                Some(id) => {
                    inner.drain_backlog(id, &observer);
                    let weak = Arc::downgrade(&inner);
                    Subscription::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.remove(id);
                        }
                    })
                }
                None => Subscription::empty(),
            }
        })
    }
}

impl<T: Clone + Send + 'static> Observer<T> for Subject<T> {
    fn on_next(&self, value: T) {
        self.next(value);
    }

    fn on_error(&self, error: StreamError) {
        self.fail(error);
    }

    fn on_completed(&self) {
        self.complete();
    }
}
