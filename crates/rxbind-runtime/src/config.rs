#![forbid(unsafe_code)]

//! Configuration for the UI-affinity dispatcher.
//!
//! [`DispatcherConfig`] is a plain value with builder-style setters. It can
//! also be read from the environment:
//!
//! | Variable                 | Meaning                                   |
//! |--------------------------|-------------------------------------------|
//! | `RXBIND_FAULT_POLICY`    | `panic` (default), `log` or `collect`     |
//! | `RXBIND_UI_THREAD_NAME`  | name of the spawned UI thread             |
//!
//! Unknown or empty values fall back to the defaults.

use std::env;

use tracing::warn;

use crate::fault::FaultPolicy;

/// Environment variable selecting the [`FaultPolicy`].
pub const FAULT_POLICY_ENV: &str = "RXBIND_FAULT_POLICY";

/// Environment variable naming the UI thread.
pub const UI_THREAD_NAME_ENV: &str = "RXBIND_UI_THREAD_NAME";

/// Default name of the thread spawned by [`UiThread`](crate::dispatch::UiThread).
pub const DEFAULT_UI_THREAD_NAME: &str = "rxbind-ui";

/// Settings for a [`UiThread`](crate::dispatch::UiThread).
///
/// With the `serde` feature, missing fields take their default values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DispatcherConfig {
    /// Name given to the UI thread.
    pub thread_name: String,
    /// How binding faults are handled.
    pub fault_policy: FaultPolicy,
    /// Whether tasks still queued at shutdown are run before the thread exits.
    pub drain_on_shutdown: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_UI_THREAD_NAME.to_owned(),
            fault_policy: FaultPolicy::default(),
            drain_on_shutdown: true,
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let policy = env::var(FAULT_POLICY_ENV).ok();
        let name = env::var(UI_THREAD_NAME_ENV).ok();
        Self::from_env_values(policy.as_deref(), name.as_deref())
    }

    /// Build a configuration from raw environment values.
    #[must_use]
    pub fn from_env_values(fault_policy: Option<&str>, thread_name: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = fault_policy.filter(|v| !v.trim().is_empty()) {
            match FaultPolicy::parse(raw) {
                Some(policy) => config.fault_policy = policy,
                None => warn!(value = raw, var = FAULT_POLICY_ENV, "unknown fault policy"),
            }
        }
        if let Some(name) = thread_name.map(str::trim).filter(|v| !v.is_empty()) {
            config.thread_name = name.to_owned();
        }
        config
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    #[must_use]
    pub fn with_drain_on_shutdown(mut self, drain: bool) -> Self {
        self.drain_on_shutdown = drain;
        self
    }
}
