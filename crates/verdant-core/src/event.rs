#![forbid(unsafe_code)]

//! Multicast events with weakly-held subscribers.
//!
//! # Design
//!
//! An [`Event<A>`] keeps a list of `Weak` handler pointers. `subscribe()`
//! returns a [`Subscription`] that owns the only strong reference to the
//! handler, so the event source never extends a subscriber's lifetime and a
//! dropped guard silently stops receiving notifications.
//!
//! # Invariants
//!
//! 1. Handlers are invoked in registration order.
//! 2. The handler list is snapshotted before invocation; a handler may
//!    subscribe, unsubscribe, or raise other events without a borrow panic.
//! 3. Dead slots are pruned lazily on the next `raise()`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<A> = dyn Fn(&A);

/// A synchronous, single-threaded multicast event carrying `&A`.
pub struct Event<A: ?Sized + 'static> {
    slots: RefCell<Vec<Weak<Handler<A>>>>,
}

impl<A: ?Sized + 'static> Event<A> {
    /// Create an event with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Register a handler. It stays registered while the returned guard is
    /// alive.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> Subscription {
        let strong: Rc<Handler<A>> = Rc::new(handler);
        self.slots.borrow_mut().push(Rc::downgrade(&strong));
        Subscription {
            _handler: Box::new(strong),
        }
    }

    /// Invoke every live handler with `args`.
    pub fn raise(&self, args: &A) {
        let live: Vec<Rc<Handler<A>>> = {
            let mut slots = self.slots.borrow_mut();
            slots.retain(|slot| slot.strong_count() > 0);
            slots.iter().filter_map(Weak::upgrade).collect()
        };
        for handler in live {
            handler(args);
        }
    }

    /// Number of subscribers whose guard is still alive.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}

impl<A: ?Sized + 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// RAII guard for an event handler. Dropping it unsubscribes.
#[must_use = "dropping the Subscription unsubscribes immediately"]
pub struct Subscription {
    _handler: Box<dyn Any>,
}

impl Subscription {
    /// Explicitly unsubscribe. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}
