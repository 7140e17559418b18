#![forbid(unsafe_code)]

//! Property-change notification base.
//!
//! [`ObservableObject`] owns the `property_changed` event and the
//! equality-gated setter every higher layer builds on. Side effects such as
//! dirty tracking or re-validation are only ever triggered by a write that
//! reports a change.

use std::cell::RefCell;

use crate::event::{Event, Subscription};

/// Change-notification primitive shared by validating objects and
/// view-models.
#[derive(Debug, Default)]
pub struct ObservableObject {
    property_changed: Event<str>,
}

impl ObservableObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in `slot` if it differs from the current value.
    ///
    /// Returns `true` when the slot was updated. The borrow on `slot` is
    /// released before this returns.
    pub fn replace_if_changed<T: PartialEq>(slot: &RefCell<T>, value: T) -> bool {
        let mut current = slot.borrow_mut();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    /// Equality-gated write that raises `property_changed(name)` on change.
    pub fn set_property<T: PartialEq>(&self, name: &str, slot: &RefCell<T>, value: T) -> bool {
        if !Self::replace_if_changed(slot, value) {
            return false;
        }
        self.raise_property_changed(name);
        true
    }

    /// Raise `property_changed` for `name` unconditionally.
    pub fn raise_property_changed(&self, name: &str) {
        tracing::trace!(message = "property.changed", property = name);
        self.property_changed.raise(name);
    }

    /// Subscribe to property-changed notifications.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_property_changed(&self, handler: impl Fn(&str) + 'static) -> Subscription {
        self.property_changed.subscribe(handler)
    }

    /// The underlying event.
    #[must_use]
    pub fn property_changed(&self) -> &Event<str> {
        &self.property_changed
    }
}
