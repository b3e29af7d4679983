#![forbid(unsafe_code)]

//! Two-way control bindings.
//!
//! A [`ControlProperty<T>`] pairs a read stream with a write sink:
//!
//! - the read side is the control's own "current value on every change"
//!   stream, attached and delivered on the UI context;
//! - the write side is an observer (usually a [`UiBinding`]) that applies
//!   values to the control.
//!
//! The two sides are wired to different resources. Writing through the
//! sink mutates the control; the read side only observes the control's
//! change notification. A write can therefore come back around on the read
//! side, but only if the control itself re-fires.
//!
//! # Echo
//!
//! Nothing here suppresses echoes. A property whose `changes()` are bound
//! back into itself settles after one round trip when the control only
//! notifies on actual changes, and recurses without bound when the control
//! notifies on every assignment. Use a change-only control (or filter
//! duplicates upstream) before closing such a loop.
//!
//! # Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use rxbind_runtime::dispatch::{DispatcherRef, ImmediateDispatcher};
//! use rxbind_runtime::reactive::{ControlProperty, EventEmitter, Observer, Stream};
//!
//! struct Slider { value: Mutex<u8>, changed: EventEmitter<()> }
//!
//! let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
//! let slider = Arc::new(Slider { value: Mutex::new(10), changed: EventEmitter::new() });
//!
//! let value = ControlProperty::from_accessors(
//!     dispatcher,
//!     Arc::clone(&slider),
//!     Stream::from_event(slider.changed.clone()),
//!     |s: &Slider| *s.value.lock().unwrap(),
//!     |s: &Slider, v: u8| {
//!         *s.value.lock().unwrap() = v;
//!         s.changed.emit(());
//!     },
//! );
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = Arc::clone(&seen);
//! let _sub = value.subscribe_next(move |v| log.lock().unwrap().push(v));
//! value.on_next(42);
//! assert_eq!(*seen.lock().unwrap(), vec![10, 42]);
//! ```

use std::fmt;
use std::sync::Arc;

use super::binding::UiBinding;
use super::control_event::ControlEvent;
use super::error::{BindingError, StreamError};
use super::stream::{Observer, SharedObserver, Stream};
use super::subscription::Subscription;
use crate::dispatch::DispatcherRef;
use crate::fault::Fault;

/// Read stream plus write sink over one control value.
pub struct ControlProperty<T> {
    dispatcher: DispatcherRef,
    values: Stream<T>,
    sink: SharedObserver<T>,
}

impl<T> Clone for ControlProperty<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            values: self.values.clone(),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T> fmt::Debug for ControlProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlProperty")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> ControlProperty<T> {
    /// Pair `values` (read side) with `sink` (write side).
    ///
    /// `values` is attached and delivered on `dispatcher`'s context.
    pub fn new(
        dispatcher: DispatcherRef,
        values: Stream<T>,
        sink: impl Observer<T> + 'static,
    ) -> Self {
        let values = values
            .subscribe_on(Arc::clone(&dispatcher))
            .observe_on(Arc::clone(&dispatcher));
        Self {
            dispatcher,
            values,
            sink: Arc::new(sink),
        }
    }

    /// Start a builder; every part is required.
    #[must_use]
    pub fn builder() -> ControlPropertyBuilder<T> {
        ControlPropertyBuilder::default()
    }

    /// Generic two-way binding over a getter/setter pair.
    ///
    /// The read side emits `get(&target)` once at subscription, then again
    /// on every `changed` notification. The write side is a [`UiBinding`]
    /// running `set`.
    pub fn from_accessors<C, E>(
        dispatcher: DispatcherRef,
        target: Arc<C>,
        changed: Stream<E>,
        get: impl Fn(&C) -> T + Send + Sync + 'static,
        set: impl Fn(&C, T) + Send + Sync + 'static,
    ) -> Self
    where
        C: Send + Sync + 'static,
        E: Send + 'static,
    {
        let get = Arc::new(get);
        let read = {
            let target = Arc::clone(&target);
            Stream::new(move |observer: SharedObserver<T>| {
                observer.on_next(get(&target));
                let target = Arc::clone(&target);
                let get = Arc::clone(&get);
                changed.map(move |_| get(&target)).subscribe(observer)
            })
        };
        let sink = UiBinding::new(Arc::clone(&dispatcher), target, set);
        Self::new(dispatcher, read, sink)
    }

    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.values.subscribe(observer)
    }

    pub fn subscribe_next(&self, next: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        self.values.subscribe_next(next)
    }

    /// Only the changes after subscription; the first value is skipped.
    #[must_use]
    pub fn changes(&self) -> ControlEvent<T> {
        ControlEvent::from_marshaled(self.values.skip(1))
    }

    /// The marshaled read side.
    #[must_use]
    pub fn as_stream(&self) -> Stream<T> {
        self.values.clone()
    }

    /// The marshaled read side, initial value included.
    #[must_use]
    pub fn as_control_event(&self) -> ControlEvent<T> {
        ControlEvent::from_marshaled(self.values.clone())
    }

    /// A copy whose read side completes when `notifier` emits.
    ///
    /// Pair with a [`Teardown`](super::Teardown) signal to stop reading at
    /// the owner's end of life.
    #[must_use]
    pub fn take_until<U: Send + 'static>(&self, notifier: &Stream<U>) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            values: self.values.take_until(notifier),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: Send + 'static> Observer<T> for ControlProperty<T> {
    fn on_next(&self, value: T) {
        self.sink.on_next(value);
    }

    fn on_error(&self, error: StreamError) {
        self.dispatcher
            .report_fault(Fault::new("ControlProperty", error));
    }

    fn on_completed(&self) {
        self.sink.on_completed();
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Checked construction of a [`ControlProperty`].
pub struct ControlPropertyBuilder<T> {
    dispatcher: Option<DispatcherRef>,
    values: Option<Stream<T>>,
    sink: Option<SharedObserver<T>>,
}

impl<T> Default for ControlPropertyBuilder<T> {
    fn default() -> Self {
        Self {
            dispatcher: None,
            values: None,
            sink: None,
        }
    }
}

impl<T> fmt::Debug for ControlPropertyBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlPropertyBuilder")
            .field("dispatcher", &self.dispatcher.is_some())
            .field("values", &self.values.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl<T: Send + 'static> ControlPropertyBuilder<T> {
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: DispatcherRef) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn values(mut self, values: Stream<T>) -> Self {
        self.values = Some(values);
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: impl Observer<T> + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// # Errors
    ///
    /// [`BindingError::MissingArgument`] if the dispatcher, values or sink
    /// was not set.
    pub fn build(self) -> Result<ControlProperty<T>, BindingError> {
        let dispatcher = self
            .dispatcher
            .ok_or(BindingError::MissingArgument("dispatcher"))?;
        let values = self.values.ok_or(BindingError::MissingArgument("values"))?;
        let sink = self.sink.ok_or(BindingError::MissingArgument("sink"))?;
        Ok(ControlProperty::new(dispatcher, values, sink))
    }
}

/// Glue-layer entry point: a two-way property over `values` and `sink`.
pub fn two_way_property<T: Send + 'static>(
    dispatcher: DispatcherRef,
    values: Stream<T>,
    sink: impl Observer<T> + 'static,
) -> ControlProperty<T> {
    ControlProperty::new(dispatcher, values, sink)
}
