#![forbid(unsafe_code)]

//! Error types: errors travelling through streams, and errors raised while
//! constructing bindings.

use std::fmt;
use std::sync::Arc;

/// An error delivered through a stream's error channel.
///
/// Cloning is cheap: the wrapped error is shared, so every observer of a
/// multicast stream receives the same instance.
#[derive(Clone)]
pub struct StreamError {
    inner: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl StreamError {
    /// Wrap any error type.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Create an error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageError(message.into()))
    }

    /// Borrow the wrapped error.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.inner
    }

    /// Attempt to downcast the wrapped error to a concrete type.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Whether both handles share the same underlying error instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StreamError").field(&self.inner).finish()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

#[derive(Debug)]
struct MessageError(String);

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MessageError {}

/// Error returned when a binding primitive is built without a required part.
///
/// Raised synchronously by the builders, before any subscription exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    /// A required argument was never supplied. Carries the argument name.
    MissingArgument(&'static str),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument(name) => write!(f, "missing required argument `{name}`"),
        }
    }
}

impl std::error::Error for BindingError {}
