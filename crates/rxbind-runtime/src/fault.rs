#![forbid(unsafe_code)]

//! Fault channel for errors that reach a binding.
//!
//! A binding is not an error boundary. When a [`UiBinding`] or
//! [`ControlProperty`] receives `on_error`, the error becomes a [`Fault`] and
//! is handed to the dispatcher's [`FaultReporter`]. What happens next is the
//! host's [`FaultPolicy`]: by default the fault panics on the reporting
//! context, so binding bugs surface instead of being dropped.
//!
//! [`UiBinding`]: crate::reactive::UiBinding
//! [`ControlProperty`]: crate::reactive::ControlProperty

use std::fmt;
use std::sync::Mutex;

use tracing::{debug, error};

use crate::reactive::StreamError;
use crate::sync::lock;

/// An error delivered to a binding's error channel.
#[derive(Clone, Debug)]
pub struct Fault {
    origin: &'static str,
    error: StreamError,
}

impl Fault {
    #[must_use]
    pub fn new(origin: &'static str, error: StreamError) -> Self {
        Self { origin, error }
    }

    /// Name of the binding primitive that received the error.
    #[must_use]
    pub fn origin(&self) -> &'static str {
        self.origin
    }

    #[must_use]
    pub fn error(&self) -> &StreamError {
        &self.error
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} received an error: {}", self.origin, self.error)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// What a [`FaultReporter`] does with a fault.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FaultPolicy {
    /// Log at `error` level, then panic on the reporting context.
    #[default]
    Panic,
    /// Log at `error` level and continue.
    Log,
    /// Store the fault for later inspection via [`FaultReporter::take`].
    Collect,
}

impl FaultPolicy {
    /// Parse a policy name (`panic`, `log`, `collect`), case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "panic" => Some(Self::Panic),
            "log" => Some(Self::Log),
            "collect" => Some(Self::Collect),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Panic => "panic",
            Self::Log => "log",
            Self::Collect => "collect",
        }
    }
}

/// Applies a [`FaultPolicy`] to reported faults.
#[derive(Debug, Default)]
pub struct FaultReporter {
    policy: FaultPolicy,
    collected: Mutex<Vec<Fault>>,
}

impl FaultReporter {
    #[must_use]
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            policy,
            collected: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Report a fault.
    ///
    /// # Panics
    ///
    /// Panics under [`FaultPolicy::Panic`].
    pub fn report(&self, fault: Fault) {
        match self.policy {
            FaultPolicy::Panic => {
                error!(origin = fault.origin, error = %fault.error, "binding fault");
                panic!("unhandled binding fault: {fault}");
            }
            FaultPolicy::Log => {
                error!(origin = fault.origin, error = %fault.error, "binding fault");
            }
            FaultPolicy::Collect => {
                debug!(origin = fault.origin, error = %fault.error, "binding fault collected");
                lock(&self.collected).push(fault);
            }
        }
    }

    /// Remove and return every collected fault.
    pub fn take(&self) -> Vec<Fault> {
        std::mem::take(&mut *lock(&self.collected))
    }

    /// Number of collected faults not yet taken.
    #[must_use]
    pub fn collected_count(&self) -> usize {
        lock(&self.collected).len()
    }
}
