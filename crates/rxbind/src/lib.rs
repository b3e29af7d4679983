#![forbid(unsafe_code)]

//! rxbind public facade crate.
//!
//! Reactive state binding for UI code: values and native events become
//! streams, and streams are bound back onto controls on the UI thread, with
//! every subscription tied to an owner's lifetime.
//!
//! # Quick start
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use rxbind::prelude::*;
//!
//! struct Label { text: Mutex<String> }
//!
//! let dispatcher: DispatcherRef = Arc::new(ImmediateDispatcher::new());
//! let label = Arc::new(Label { text: Mutex::new(String::new()) });
//! let count = Variable::new(0u32);
//! let bag = SubscriptionBag::new();
//!
//! count
//!     .observe()
//!     .map(|n| format!("clicked {n} times"))
//!     .bind_to(UiBinding::new(dispatcher, Arc::clone(&label), |l: &Label, t: String| {
//!         *l.text.lock().unwrap() = t;
//!     }))
//!     .dispose_by(&bag);
//!
//! count.update(|n| n + 1);
//! assert_eq!(*label.text.lock().unwrap(), "clicked 1 times");
//! ```

pub use rxbind_runtime as runtime;
pub use rxbind_runtime::{config, dispatch, fault, marshal, reactive};

pub use rxbind_runtime::{
    BindingError, ControlEvent, ControlProperty, DispatchError, Dispatcher, DispatcherConfig,
    DispatcherRef, EventEmitter, EventSource, Fault, FaultPolicy, ImmediateDispatcher,
    ManualDispatcher, Observer, Stream, StreamError, Subject, Subscription, SubscriptionBag,
    Teardown, UiBinding, UiThread, Variable,
};

/// Glue-layer constructors.
pub mod glue {
    pub use rxbind_runtime::reactive::{bind_property, two_way_property, wrap_event};
}

/// Everything needed to write bindings, in one import.
pub mod prelude {
    pub use crate::glue::*;
    pub use rxbind_runtime::dispatch::{
        Dispatcher, DispatcherRef, ImmediateDispatcher, ManualDispatcher, UiThread,
    };
    pub use rxbind_runtime::reactive::{
        BindingError, CallbackObserver, ControlEvent, ControlProperty, EventEmitter, EventSource,
        Observer, ReplayMode, Stream, StreamError, Subject, Subscription, SubscriptionBag,
        Teardown, UiBinding, Variable, observer_fn,
    };
    pub use rxbind_runtime::{DispatcherConfig, FaultPolicy};
}
