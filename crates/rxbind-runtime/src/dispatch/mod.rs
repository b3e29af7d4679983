#![forbid(unsafe_code)]

//! The UI-affinity execution context.
//!
//! Bindings never assume a global UI thread. Each one is handed a
//! [`Dispatcher`], the capability to ask "am I on the UI context?" and to
//! post work onto it.
//!
//! Three implementations are provided:
//!
//! - [`ImmediateDispatcher`]: every caller is on-context; tasks run inline.
//! - [`ManualDispatcher`]: a FIFO queue drained explicitly; only the draining
//!   thread is on-context. Deterministic stand-in for a host event loop.
//! - [`UiThread`]: a dedicated thread running a FIFO task queue.
//!
//! # Contract
//!
//! 1. `run_on_context` never blocks and never runs the task before returning
//!    unless the implementation is inherently synchronous
//!    ([`ImmediateDispatcher`]).
//! 2. Tasks posted from one thread run in the order they were posted.
//! 3. `report_fault` applies the host's [`FaultPolicy`](crate::fault::FaultPolicy).

mod manual;
mod ui_thread;

use std::fmt;
use std::sync::Arc;

use crate::fault::{Fault, FaultPolicy, FaultReporter};

pub use manual::ManualDispatcher;
pub use ui_thread::{DispatchError, UiThread};

/// A unit of work posted to the UI context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a dispatcher, as injected into bindings.
pub type DispatcherRef = Arc<dyn Dispatcher>;

/// Capability to run work on the UI-affinity context.
pub trait Dispatcher: Send + Sync {
    /// Whether the calling thread is currently on the UI context.
    fn has_access(&self) -> bool;

    /// Enqueue `task` to run on the UI context.
    fn run_on_context(&self, task: Task);

    /// Enqueue `task`, handing it back if the context has stopped and can
    /// no longer run it.
    fn try_run_on_context(&self, task: Task) -> Result<(), Task> {
        self.run_on_context(task);
        Ok(())
    }

    /// Surface a binding fault through the host's fault policy.
    fn report_fault(&self, fault: Fault);
}

/// Dispatcher for which every caller is on-context.
///
/// Useful when there is no thread affinity to honour, and as the fake
/// synchronous scheduler in tests.
#[derive(Debug, Default)]
pub struct ImmediateDispatcher {
    faults: FaultReporter,
}

impl ImmediateDispatcher {
    /// Create a dispatcher with the default (panicking) fault policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fault_policy(policy: FaultPolicy) -> Self {
        Self {
            faults: FaultReporter::new(policy),
        }
    }

    #[must_use]
    pub fn faults(&self) -> &FaultReporter {
        &self.faults
    }
}

impl Dispatcher for ImmediateDispatcher {
    fn has_access(&self) -> bool {
        true
    }

    fn run_on_context(&self, task: Task) {
        task();
    }

    fn report_fault(&self, fault: Fault) {
        self.faults.report(fault);
    }
}

impl fmt::Debug for dyn Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("has_access", &self.has_access())
            .finish_non_exhaustive()
    }
}
