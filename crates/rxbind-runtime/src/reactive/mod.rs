#![forbid(unsafe_code)]

//! Reactive binding primitives.
//!
//! - [`Stream`], [`Observer`], [`Subject`]: the push-stream substrate. Only
//!   the operators the bindings need are provided.
//! - [`UiBinding`]: write side. Applies values to a control on the UI
//!   context.
//! - [`ControlEvent`]: read side for events. Attaches and delivers on the UI
//!   context.
//! - [`ControlProperty`]: two-way binding, a read stream plus a write sink.
//! - [`Variable`]: stand-alone mutable cell with current-value replay.
//! - [`SubscriptionBag`] and [`Teardown`]: subscription lifetime tied to an
//!   owner.
//!
//! # Architecture
//!
//! Streams are cold: a [`Stream`] is its subscribe function, and each
//! subscriber gets its own upstream subscription. Sharing happens only
//! through a [`Subject`], which is what [`Variable`] and [`Teardown`] are
//! built on.
//!
//! Thread affinity comes from the injected
//! [`Dispatcher`](crate::dispatch::Dispatcher). Every hop onto the UI
//! context goes through one [`Marshaler`](crate::marshal::Marshaler).
//!
//! # Invariants
//!
//! 1. No signal follows a terminal signal, provided the upstream signals
//!    serially.
//! 2. No signal reaches an observer after its subscription is cancelled,
//!    except values already posted to the UI queue.
//! 3. Values from one producer reach a binding in the order produced.
//! 4. Internal locks are never held while user callbacks run.

pub mod bag;
pub mod binding;
pub mod control_event;
pub mod control_property;
pub mod error;
pub mod event;
pub mod stream;
pub mod subject;
pub mod subscription;
pub mod teardown;
pub mod variable;

pub use bag::SubscriptionBag;
pub use binding::{UiBinding, UiBindingBuilder, bind_property};
pub use control_event::{ControlEvent, wrap_event};
pub use control_property::{ControlProperty, ControlPropertyBuilder, two_way_property};
pub use error::{BindingError, StreamError};
pub use event::{EventEmitter, EventSource, Handler, HandlerId};
pub use stream::{
    CallbackObserver, Observer, SharedObserver, Stream, WORKER_THREAD_NAME, observer_fn,
};
pub use subject::{ReplayMode, Subject};
pub use subscription::Subscription;
pub use teardown::Teardown;
pub use variable::Variable;
