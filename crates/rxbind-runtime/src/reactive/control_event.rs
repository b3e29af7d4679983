#![forbid(unsafe_code)]

//! Marshaled, restartable event streams.
//!
//! A [`ControlEvent<T>`] wraps a raw stream so that subscribing to it, and
//! every signal it delivers, happens on the dispatcher's UI context. It does
//! not multicast: each subscriber gets an independent subscription to the
//! raw stream, so whatever sharing the raw stream does is preserved as is.

use std::fmt;

use super::error::BindingError;
use super::event::EventSource;
use super::stream::{Observer, Stream};
use super::subscription::Subscription;
use crate::dispatch::DispatcherRef;

/// Event stream delivered on the UI context.
pub struct ControlEvent<T> {
    stream: Stream<T>,
}

impl<T> Clone for ControlEvent<T> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<T> fmt::Debug for ControlEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlEvent").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> ControlEvent<T> {
    /// Wrap `raw`: attach on the UI context and deliver there.
    pub fn new(dispatcher: DispatcherRef, raw: Stream<T>) -> Self {
        Self {
            stream: raw.subscribe_on(dispatcher.clone()).observe_on(dispatcher),
        }
    }

    /// Wrap a stream that is already attached and delivered on the UI context.
    pub(crate) fn from_marshaled(stream: Stream<T>) -> Self {
        Self { stream }
    }

    /// Checked form of [`new`](Self::new) for optional inputs.
    ///
    /// # Errors
    ///
    /// [`BindingError::MissingArgument`] if either input is `None`.
    pub fn try_new(
        dispatcher: Option<DispatcherRef>,
        raw: Option<Stream<T>>,
    ) -> Result<Self, BindingError> {
        let dispatcher = dispatcher.ok_or(BindingError::MissingArgument("dispatcher"))?;
        let raw = raw.ok_or(BindingError::MissingArgument("raw"))?;
        Ok(Self::new(dispatcher, raw))
    }

    /// Wrap a native notification source.
    pub fn from_source<S: EventSource<T>>(dispatcher: DispatcherRef, source: S) -> Self {
        Self::new(dispatcher, Stream::from_event(source))
    }

    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.stream.subscribe(observer)
    }

    pub fn subscribe_next(&self, next: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        self.stream.subscribe_next(next)
    }

    /// The marshaled stream, for composing with other operators.
    #[must_use]
    pub fn as_stream(&self) -> Stream<T> {
        self.stream.clone()
    }

    #[must_use]
    pub fn as_control_event(&self) -> ControlEvent<T> {
        self.clone()
    }
}

impl<T> From<ControlEvent<T>> for Stream<T> {
    fn from(event: ControlEvent<T>) -> Self {
        event.stream
    }
}

/// Glue-layer entry point: a marshaled stream over `source`.
pub fn wrap_event<T, S>(dispatcher: DispatcherRef, source: S) -> ControlEvent<T>
where
    T: Send + 'static,
    S: EventSource<T>,
{
    ControlEvent::from_source(dispatcher, source)
}
