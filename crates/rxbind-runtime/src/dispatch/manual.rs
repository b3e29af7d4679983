#![forbid(unsafe_code)]

//! Manually drained FIFO dispatcher.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use tracing::trace;

use super::{Dispatcher, Task};
use crate::fault::{Fault, FaultPolicy, FaultReporter};
use crate::sync::lock;

/// A dispatcher whose queue only runs when [`run_pending`](Self::run_pending)
/// is called.
///
/// The thread inside `run_pending` is the UI context for the duration of
/// the call; every other thread, and the same thread outside the call, is
/// off-context. This gives tests full control over when marshaled work
/// happens.
///
/// Faults are collected by default.
pub struct ManualDispatcher {
    queue: Mutex<VecDeque<Task>>,
    draining: Mutex<Option<ThreadId>>,
    faults: FaultReporter,
}

impl ManualDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_fault_policy(FaultPolicy::Collect)
    }

    #[must_use]
    pub fn with_fault_policy(policy: FaultPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            draining: Mutex::new(None),
            faults: FaultReporter::new(policy),
        }
    }

    /// Run queued tasks, including tasks they enqueue, until the queue is
    /// empty. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let _guard = DrainGuard::enter(&self.draining);
        let mut ran = 0;
        loop {
            let task = lock(&self.queue).pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        trace!(ran, "manual dispatcher drained");
        ran
    }

    /// Run at most one queued task. Returns whether a task ran.
    pub fn run_one(&self) -> bool {
        let _guard = DrainGuard::enter(&self.draining);
        let task = lock(&self.queue).pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    #[must_use]
    pub fn faults(&self) -> &FaultReporter {
        &self.faults
    }
}

impl Default for ManualDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualDispatcher")
            .field("pending", &self.pending())
            .field("fault_policy", &self.faults.policy())
            .finish()
    }
}

impl Dispatcher for ManualDispatcher {
    fn has_access(&self) -> bool {
        *lock(&self.draining) == Some(thread::current().id())
    }

    fn run_on_context(&self, task: Task) {
        lock(&self.queue).push_back(task);
    }

    fn report_fault(&self, fault: Fault) {
        self.faults.report(fault);
    }
}

/// Marks the current thread as on-context; restores the previous owner on
/// drop, including when a task panics.
struct DrainGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
    previous: Option<ThreadId>,
}

impl<'a> DrainGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        let previous = lock(slot).replace(thread::current().id());
        Self { slot, previous }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        *lock(self.slot) = self.previous;
    }
}
