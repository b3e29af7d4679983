#![forbid(unsafe_code)]

//! Lock helpers shared by the runtime.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every mutex in this crate guards plain bookkeeping (observer lists, task
/// queues) that stays structurally valid across a panic, so poisoning is
/// not treated as fatal.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
