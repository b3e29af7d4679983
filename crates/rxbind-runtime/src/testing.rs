//! Recording observer for unit tests.

use std::sync::{Arc, Mutex};

use crate::reactive::{Observer, StreamError};

/// One recorded signal. Errors are kept as their display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event<T> {
    Next(T),
    Error(String),
    Completed,
}

/// Observer that records every signal it receives.
///
/// Clones share the same log, so one clone can be handed to `subscribe` while
/// another is inspected.
pub(crate) struct Recorder<T> {
    events: Arc<Mutex<Vec<Event<T>>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn events(&self) -> Vec<Event<T>> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|event| matches!(event, Event::Completed))
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.events.lock().unwrap().iter().find_map(|event| match event {
            Event::Error(message) => Some(message.clone()),
            _ => None,
        })
    }
}

impl<T: Send> Observer<T> for Recorder<T> {
    fn on_next(&self, value: T) {
        self.events.lock().unwrap().push(Event::Next(value));
    }

    fn on_error(&self, error: StreamError) {
        self.events.lock().unwrap().push(Event::Error(error.to_string()));
    }

    fn on_completed(&self) {
        self.events.lock().unwrap().push(Event::Completed);
    }
}
