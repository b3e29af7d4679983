#![forbid(unsafe_code)]

//! Reactive state binding with UI thread affinity.
//!
//! This crate provides:
//! - [`reactive`]: streams, two-way control bindings, variables and
//!   subscription lifetimes
//! - [`dispatch`]: the injected UI-affinity context and its implementations
//! - [`marshal`]: the single hop onto that context
//! - [`fault`]: how errors reaching a binding are surfaced
//! - [`config`]: dispatcher configuration, including from the environment

pub mod config;
pub mod dispatch;
pub mod fault;
pub mod marshal;
pub mod reactive;

mod sync;
#[cfg(test)]
mod testing;

pub use config::DispatcherConfig;
pub use dispatch::{
    DispatchError, Dispatcher, DispatcherRef, ImmediateDispatcher, ManualDispatcher, Task,
    UiThread,
};
pub use fault::{Fault, FaultPolicy, FaultReporter};
pub use marshal::{Delivery, Marshaler};
pub use reactive::{
    BindingError, ControlEvent, ControlProperty, EventEmitter, EventSource, Observer, Stream,
    StreamError, Subject, Subscription, SubscriptionBag, Teardown, UiBinding, Variable,
};
