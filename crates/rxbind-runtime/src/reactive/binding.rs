#![forbid(unsafe_code)]

//! UI-marshaling write side of a binding.
//!
//! A [`UiBinding<C, T>`] is an [`Observer<T>`] that applies each value to a
//! target control `C` through a caller-supplied apply function, always on the
//! dispatcher's UI context.
//!
//! # Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use rxbind_runtime::dispatch::{DispatcherRef, ImmediateDispatcher};
//! use rxbind_runtime::reactive::{UiBinding, Variable};
//!
//! struct Label { text: Mutex<String> }
//!
//! let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
//! let label = Arc::new(Label { text: Mutex::new(String::new()) });
//! let title = Variable::new("ready".to_string());
//!
//! let sink = UiBinding::new(dispatcher, Arc::clone(&label), |l: &Label, v: String| {
//!     *l.text.lock().unwrap() = v;
//! });
//! let _sub = title.observe().bind_to(sink);
//! title.set("done".into());
//! assert_eq!(*label.text.lock().unwrap(), "done");
//! ```
//!
//! # Invariants
//!
//! 1. `apply` only ever runs on the UI context.
//! 2. On-context, `apply` has run before `on_next` returns.
//! 3. Off-context, `apply` runs strictly after `on_next` returns, and two
//!    values from one producer are applied in the order received.
//!
//! # Failure Modes
//!
//! - `on_error` does not swallow the error: it becomes a [`Fault`] handed
//!   to [`Dispatcher::report_fault`](crate::dispatch::Dispatcher::report_fault),
//!   which panics under the default policy.
//! - A value already posted to the UI queue still applies after the
//!   subscription is cancelled. Check liveness inside `apply` when that
//!   matters.

use std::fmt;
use std::sync::Arc;

use super::error::{BindingError, StreamError};
use super::stream::Observer;
use crate::dispatch::DispatcherRef;
use crate::fault::Fault;
use crate::marshal::Marshaler;

type ApplyFn<C, T> = Arc<dyn Fn(&C, T) + Send + Sync>;

/// Observer applying values to a control on the UI context.
pub struct UiBinding<C, T> {
    target: Arc<C>,
    apply: ApplyFn<C, T>,
    marshaler: Marshaler,
}

impl<C, T> Clone for UiBinding<C, T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            apply: Arc::clone(&self.apply),
            marshaler: self.marshaler.clone(),
        }
    }
}

impl<C, T> fmt::Debug for UiBinding<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiBinding")
            .field("target", &std::any::type_name::<C>())
            .field("marshaler", &self.marshaler)
            .finish_non_exhaustive()
    }
}

impl<C, T> UiBinding<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Bind `apply` to `target` on `dispatcher`'s context.
    pub fn new(
        dispatcher: DispatcherRef,
        target: Arc<C>,
        apply: impl Fn(&C, T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            target,
            apply: Arc::new(apply),
            marshaler: Marshaler::new(dispatcher),
        }
    }

    /// Start a builder; every part is required.
    #[must_use]
    pub fn builder() -> UiBindingBuilder<C, T> {
        UiBindingBuilder::default()
    }

    #[must_use]
    pub fn target(&self) -> &Arc<C> {
        &self.target
    }
}

impl<C, T> Observer<T> for UiBinding<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    fn on_next(&self, value: T) {
        let target = Arc::clone(&self.target);
        let apply = Arc::clone(&self.apply);
        self.marshaler.run(move || apply(&target, value));
    }

    fn on_error(&self, error: StreamError) {
        self.marshaler
            .dispatcher()
            .report_fault(Fault::new("UiBinding", error));
    }

    fn on_completed(&self) {}
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Checked construction of a [`UiBinding`].
///
/// [`build`](Self::build) fails with [`BindingError::MissingArgument`] naming
/// the first part that was never supplied.
pub struct UiBindingBuilder<C, T> {
    dispatcher: Option<DispatcherRef>,
    target: Option<Arc<C>>,
    apply: Option<ApplyFn<C, T>>,
}

impl<C, T> Default for UiBindingBuilder<C, T> {
    fn default() -> Self {
        Self {
            dispatcher: None,
            target: None,
            apply: None,
        }
    }
}

impl<C, T> fmt::Debug for UiBindingBuilder<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiBindingBuilder")
            .field("dispatcher", &self.dispatcher.is_some())
            .field("target", &self.target.is_some())
            .field("apply", &self.apply.is_some())
            .finish()
    }
}

impl<C, T> UiBindingBuilder<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: DispatcherRef) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn target(mut self, target: Arc<C>) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn apply(mut self, apply: impl Fn(&C, T) + Send + Sync + 'static) -> Self {
        self.apply = Some(Arc::new(apply));
        self
    }

    /// # Errors
    ///
    /// [`BindingError::MissingArgument`] if the dispatcher, target or apply
    /// function was not set.
    pub fn build(self) -> Result<UiBinding<C, T>, BindingError> {
        let dispatcher = self
            .dispatcher
            .ok_or(BindingError::MissingArgument("dispatcher"))?;
        let target = self.target.ok_or(BindingError::MissingArgument("target"))?;
        let apply = self.apply.ok_or(BindingError::MissingArgument("apply"))?;
        Ok(UiBinding {
            target,
            apply,
            marshaler: Marshaler::new(dispatcher),
        })
    }
}

/// Glue-layer entry point: an observer applying values to `target`.
pub fn bind_property<C, T>(
    dispatcher: DispatcherRef,
    target: Arc<C>,
    apply: impl Fn(&C, T) + Send + Sync + 'static,
) -> UiBinding<C, T>
where
    C: Send + Sync + 'static,
    T: Send + 'static,
{
    UiBinding::new(dispatcher, target, apply)
}
