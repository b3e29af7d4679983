#![forbid(unsafe_code)]

//! One-shot end-of-life signal.
//!
//! A [`Teardown`] belongs to an owner (a view, a controller) and fires
//! exactly once: on [`Teardown::fire`], or when it is dropped. Firing
//! delivers a single `()` followed by completion. The notification is
//! replayed, so a subscriber attaching after the owner ended still sees it.
//!
//! The usual pairing is with [`Stream::take_until`]:
//!
//! ```
//! use rxbind_runtime::reactive::{Subject, Teardown};
//!
//! let teardown = Teardown::new();
//! let values = Subject::publish();
//! let _sub = values
//!     .as_stream()
//!     .take_until(&teardown.signal())
//!     .subscribe_next(|v: i32| println!("{v}"));
//!
//! assert_eq!(values.observer_count(), 1);
//! teardown.fire();
//! assert_eq!(values.observer_count(), 0);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::stream::Stream;
use super::subject::Subject;

/// Fire-once owner end-of-life signal.
pub struct Teardown {
    subject: Subject<()>,
    fired: AtomicBool,
}

impl Teardown {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subject: Subject::replay(1),
            fired: AtomicBool::new(false),
        }
    }

    /// The end-of-life stream: `()` then completion, replayed to late
    /// subscribers.
    ///
    /// The stream keeps the signal alive, so it still replays after the
    /// `Teardown` itself is gone.
    #[must_use]
    pub fn signal(&self) -> Stream<()> {
        let subject = self.subject.clone();
        Stream::new(move |observer| subject.as_stream().subscribe(observer))
    }

    /// Fire the signal. Idempotent; of concurrent callers exactly one
    /// delivers the notification.
    pub fn fire(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(observers = self.subject.observer_count(), "teardown fired");
        self.subject.next(());
        self.subject.complete();
    }

    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.fire();
    }
}
