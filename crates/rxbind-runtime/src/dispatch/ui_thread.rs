#![forbid(unsafe_code)]

//! Dedicated UI thread with a FIFO task queue.
//!
//! [`UiThread`] owns one spawned thread and is the UI-affinity context for
//! every binding it is injected into. Tasks travel over an unbounded channel,
//! so posting never blocks and tasks from one sender run in posting order.
//!
//! # Shutdown
//!
//! [`UiThread::shutdown`] enqueues a shutdown marker and joins the thread.
//! With `drain_on_shutdown` (the default) tasks already queued behind the
//! marker still run; otherwise they are dropped. Tasks posted after the
//! thread has exited are dropped with a `warn!`, except through
//! [`Dispatcher::try_run_on_context`], which hands them back. Detaching a
//! `subscribe_on` subscription uses it, so event handlers are still removed
//! (on the cancelling thread) once the UI thread is gone. Dropping the last
//! handle shuts the thread down.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rxbind_runtime::config::DispatcherConfig;
//! use rxbind_runtime::dispatch::{Dispatcher, DispatcherRef, UiThread};
//!
//! let ui = Arc::new(UiThread::start(DispatcherConfig::default()).unwrap());
//! let dispatcher: DispatcherRef = ui.clone();
//! assert!(!dispatcher.has_access());
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! let probe = ui.clone();
//! dispatcher.run_on_context(Box::new(move || tx.send(probe.has_access()).unwrap()));
//! assert!(rx.recv().unwrap());
//!
//! ui.shutdown();
//! ```

use std::fmt;
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use tracing::{debug, warn};

use super::{Dispatcher, Task};
use crate::config::DispatcherConfig;
use crate::fault::{Fault, FaultReporter};
use crate::sync::lock;

/// Messages consumed by the UI thread's loop.
enum UiMsg {
    Run(Task),
    Shutdown,
}

/// Error raised by [`UiThread`] operations.
#[derive(Debug)]
pub enum DispatchError {
    /// The UI thread could not be spawned.
    Spawn(io::Error),
    /// The UI thread has exited; the task was not queued.
    Disconnected,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to spawn ui thread: {err}"),
            Self::Disconnected => write!(f, "ui thread has shut down"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) => Some(err),
            Self::Disconnected => None,
        }
    }
}

/// Handle to a running UI thread.
pub struct UiThread {
    sender: mpsc::Sender<UiMsg>,
    thread_id: ThreadId,
    thread_name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
    faults: FaultReporter,
}

impl UiThread {
    /// Spawn the UI thread.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Spawn`] if the OS refuses to create the thread.
    pub fn start(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let (tx, rx) = mpsc::channel::<UiMsg>();
        let drain = config.drain_on_shutdown;
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || ui_loop(rx, drain))
            .map_err(DispatchError::Spawn)?;
        let thread_id = handle.thread().id();
        debug!(thread = %config.thread_name, policy = config.fault_policy.as_str(), "ui thread started");
        Ok(Self {
            sender: tx,
            thread_id,
            thread_name: config.thread_name,
            handle: Mutex::new(Some(handle)),
            faults: FaultReporter::new(config.fault_policy),
        })
    }

    /// Post a task, reporting whether it was queued.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Disconnected`] if the thread has already exited.
    pub fn post(&self, task: Task) -> Result<(), DispatchError> {
        self.sender
            .send(UiMsg::Run(task))
            .map_err(|_| DispatchError::Disconnected)
    }

    /// Stop the thread and wait for it to exit. Idempotent.
    ///
    /// Called from the UI thread itself, this only requests the stop; the
    /// thread exits once the current task returns.
    pub fn shutdown(&self) {
        let _ = self.sender.send(UiMsg::Shutdown);
        if thread::current().id() == self.thread_id {
            return;
        }
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(thread = %self.thread_name, "ui thread panicked");
            }
            debug!(thread = %self.thread_name, "ui thread stopped");
        }
    }

    /// Whether the thread is still accepting tasks.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    #[must_use]
    pub fn faults(&self) -> &FaultReporter {
        &self.faults
    }
}

impl Dispatcher for UiThread {
    fn has_access(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn run_on_context(&self, task: Task) {
        if self.post(task).is_err() {
            warn!(thread = %self.thread_name, "task posted after ui thread shutdown; dropped");
        }
    }

    fn try_run_on_context(&self, task: Task) -> Result<(), Task> {
        match self.sender.send(UiMsg::Run(task)) {
            Ok(()) => Ok(()),
            Err(mpsc::SendError(UiMsg::Run(task))) => Err(task),
            Err(mpsc::SendError(UiMsg::Shutdown)) => Ok(()),
        }
    }

    fn report_fault(&self, fault: Fault) {
        self.faults.report(fault);
    }
}

impl fmt::Debug for UiThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiThread")
            .field("thread_name", &self.thread_name)
            .field("thread_id", &self.thread_id)
            .field("fault_policy", &self.faults.policy())
            .finish()
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ui_loop(rx: mpsc::Receiver<UiMsg>, drain_on_shutdown: bool) {
    while let Ok(msg) = rx.recv() {
        match msg {
            UiMsg::Run(task) => task(),
            UiMsg::Shutdown => {
                if drain_on_shutdown {
                    while let Ok(msg) = rx.try_recv() {
                        if let UiMsg::Run(task) = msg {
                            task();
                        }
                    }
                }
                return;
            }
        }
    }
}
