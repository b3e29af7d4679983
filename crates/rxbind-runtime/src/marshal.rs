#![forbid(unsafe_code)]

//! Routing work onto the UI-affinity context.
//!
//! [`Marshaler::run`] is the single hop every binding goes through:
//!
//! - on-context: the job runs synchronously, before `run` returns;
//! - off-context: a task is posted that performs the same check again on
//!   the context, so the job runs there, strictly after `run` returned.
//!
//! Two jobs marshaled from the same off-context thread run in the order
//! they were marshaled, because every provided dispatcher is FIFO. Jobs from
//! different threads have no relative ordering.

use std::fmt;

use tracing::{debug, trace};

use crate::dispatch::DispatcherRef;

/// How a marshaled job was delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The caller was on-context; the job already ran.
    Immediate,
    /// The job was posted to the dispatcher and runs later.
    Deferred,
}

/// Thread marshaler bound to one dispatcher.
#[derive(Clone)]
pub struct Marshaler {
    dispatcher: DispatcherRef,
}

impl Marshaler {
    #[must_use]
    pub fn new(dispatcher: DispatcherRef) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &DispatcherRef {
        &self.dispatcher
    }

    #[must_use]
    pub fn is_on_context(&self) -> bool {
        self.dispatcher.has_access()
    }

    /// Run `job` on the dispatcher's context.
    pub fn run(&self, job: impl FnOnce() + Send + 'static) -> Delivery {
        if self.dispatcher.has_access() {
            job();
            return Delivery::Immediate;
        }
        trace!("marshaling job onto ui context");
        let again = self.clone();
        self.dispatcher.run_on_context(Box::new(move || {
            again.run(job);
        }));
        Delivery::Deferred
    }

    /// Like [`run`](Self::run), but if the dispatcher has stopped the job
    /// runs on the calling thread instead of being dropped.
    ///
    /// Meant for releasing resources, where skipping the job would leak.
    pub fn run_or_inline(&self, job: impl FnOnce() + Send + 'static) -> Delivery {
        if self.dispatcher.has_access() {
            job();
            return Delivery::Immediate;
        }
        match self.dispatcher.try_run_on_context(Box::new(job)) {
            Ok(()) => Delivery::Deferred,
            Err(job) => {
                debug!("ui context stopped; running release job inline");
                job();
                Delivery::Immediate
            }
        }
    }
}

impl fmt::Debug for Marshaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaler")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl From<DispatcherRef> for Marshaler {
    fn from(dispatcher: DispatcherRef) -> Self {
        Self::new(dispatcher)
    }
}
