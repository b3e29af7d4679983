#![forbid(unsafe_code)]

//! Native notification sources.
//!
//! An [`EventSource`] is anything that lets a handler be attached and later
//! detached by token: a toolkit's click event, a text-changed notification,
//! a timer. [`Stream::from_event`] turns one into a cold [`Stream`]: each
//! subscriber attaches its own handler and detaches it on cancel or when
//! the stream terminates.
//!
//! [`EventEmitter`] is a plain in-process source, used by glue code that
//! owns its notifications and by tests that stand in for a real control.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::stream::{SharedObserver, Stream};
use super::subscription::Subscription;
use crate::sync::lock;

/// Token identifying an attached handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Callback attached to an [`EventSource`].
pub type Handler<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Attach/detach capability for a native notification.
pub trait EventSource<E>: Send + Sync + 'static {
    /// Attach `handler`, returning the token that detaches it.
    fn add_handler(&self, handler: Handler<E>) -> HandlerId;

    /// Detach a previously attached handler. Unknown tokens are ignored.
    fn remove_handler(&self, id: HandlerId);
}

impl<E, S: EventSource<E> + ?Sized> EventSource<E> for Arc<S> {
    fn add_handler(&self, handler: Handler<E>) -> HandlerId {
        (**self).add_handler(handler)
    }

    fn remove_handler(&self, id: HandlerId) {
        (**self).remove_handler(id);
    }
}

// ---------------------------------------------------------------------------
// EventEmitter
// ---------------------------------------------------------------------------

struct EmitterInner<E> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(HandlerId, Handler<E>)>>,
}

/// In-process [`EventSource`]. Clones share the handler list.
pub struct EventEmitter<E> {
    inner: Arc<EmitterInner<E>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl<E> EventEmitter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                next_id: AtomicU64::new(1),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        lock(&self.inner.handlers).len()
    }
}

impl<E: Clone> EventEmitter<E> {
    /// Invoke every attached handler with `event`, in attach order.
    ///
    /// Handlers run outside the internal lock and may attach or detach
    /// handlers themselves; such changes apply from the next `emit`.
    pub fn emit(&self, event: E) {
        let handlers: Vec<Handler<E>> = lock(&self.inner.handlers)
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }
}

impl<E: 'static> EventSource<E> for EventEmitter<E> {
    fn add_handler(&self, handler: Handler<E>) -> HandlerId {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.handlers).push((id, handler));
        id
    }

    fn remove_handler(&self, id: HandlerId) {
        lock(&self.inner.handlers).retain(|(hid, _)| *hid != id);
    }
}

// ---------------------------------------------------------------------------
// Stream::from_event
// ---------------------------------------------------------------------------

impl<E: Send + 'static> Stream<E> {
    /// A stream of every notification raised by `source` while subscribed.
    ///
    /// The stream never completes on its own.
    pub fn from_event<S: EventSource<E>>(source: S) -> Self {
        let source = Arc::new(source);
        Stream::new(move |observer: SharedObserver<E>| {
            let handler: Handler<E> = Arc::new(move |event: E| observer.on_next(event));
            let id = source.add_handler(handler);
            trace!(handler = id.get(), "event handler attached");
            let source = Arc::clone(&source);
            Subscription::new(move || {
                source.remove_handler(id);
                trace!(handler = id.get(), "event handler detached");
            })
        })
    }
}
