#![forbid(unsafe_code)]

//! Per-property validation registry and the [`ValidatingObject`] built on it.
//!
//! # Design
//!
//! Rules are registered against a property name together with the value type
//! seen at the call site. Each property either carries a getter that reads
//! its live value, or a snapshot of the last value the registry was told
//! about; [`ValidationRegistry::validate_all`] re-checks every property from
//! that source without reaching back into the owner.
//!
//! Messages produced by rules and messages supplied from outside through
//! [`ValidationRegistry::set_errors`] are kept apart and read back as one
//! list, rule messages first, so neither source can erase the other.
//!
//! # Invariants
//!
//! 1. A name is present in the error map only while its error list is
//!    non-empty.
//! 2. `has_errors()` is true iff the error map is non-empty; `is_valid()` is
//!    its negation at every observation point.
//! 3. Error lists keep rule registration order.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::{Result, VmError};
use crate::event::{Event, Subscription};
use crate::observable::ObservableObject;
use crate::property::{HAS_ERRORS, IS_VALID};
use crate::validation::Validation;

trait ErasedRules {
    /// Messages for the current value, or `None` when no value is known yet.
    fn recompute(&self) -> Option<Vec<String>>;
    fn value_type(&self) -> &'static str;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct PropertyRules<T> {
    rules: Vec<Box<dyn Validation<T>>>,
    value: Option<T>,
    getter: Option<Box<dyn Fn() -> T>>,
}

impl<T: 'static> PropertyRules<T> {
    fn check(&self, value: &T) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| !rule.validate(value))
            .map(|rule| rule.error_message(value))
            .collect()
    }
}

impl<T: 'static> ErasedRules for PropertyRules<T> {
    fn recompute(&self) -> Option<Vec<String>> {
        if let Some(getter) = &self.getter {
            return Some(self.check(&getter()));
        }
        self.value.as_ref().map(|value| self.check(value))
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Outcome of an error-map recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorsUpdate {
    /// Properties whose error list changed, in the order they were checked.
    pub changed: Vec<String>,
    /// Aggregate state before the recomputation.
    pub had_errors: bool,
    /// Aggregate state after the recomputation.
    pub has_errors: bool,
}

impl ErrorsUpdate {
    fn starting(had_errors: bool) -> Self {
        Self {
            changed: Vec::new(),
            had_errors,
            has_errors: had_errors,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Whether `has_errors` (and therefore `is_valid`) flipped.
    #[must_use]
    pub fn aggregate_changed(&self) -> bool {
        self.had_errors != self.has_errors
    }
}

/// Property name to typed rules, plus the current error map.
#[derive(Default)]
pub struct ValidationRegistry {
    rules: BTreeMap<String, Box<dyn ErasedRules>>,
    /// Messages produced by registered rules.
    own: BTreeMap<String, Vec<String>>,
    /// Messages supplied through `set_errors`.
    external: BTreeMap<String, Vec<String>>,
    /// `own` followed by `external`, non-empty lists only.
    errors: BTreeMap<String, Vec<String>>,
}

impl std::fmt::Debug for ValidationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRegistry")
            .field("properties", &self.rules.keys().collect::<Vec<_>>())
            .field("errors", &self.errors)
            .finish()
    }
}

impl ValidationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn typed_entry<T: 'static>(&mut self, name: &str) -> Result<&mut PropertyRules<T>> {
        let entry = self.rules.entry(name.to_owned()).or_insert_with(|| {
            Box::new(PropertyRules::<T> {
                rules: Vec::new(),
                value: None,
                getter: None,
            })
        });
        let expected = entry.value_type();
        entry
            .as_any_mut()
            .downcast_mut::<PropertyRules<T>>()
            .ok_or_else(|| VmError::PropertyTypeMismatch {
                property: name.to_owned(),
                expected,
            })
    }

    /// Register `validation` under `name`. When `current` is supplied, or
    /// the property already has a getter, its error list is recomputed
    /// immediately.
    pub fn add<T: 'static>(
        &mut self,
        name: &str,
        validation: impl Validation<T> + 'static,
        current: Option<T>,
    ) -> Result<ErrorsUpdate> {
        let typed = self.typed_entry::<T>(name)?;
        typed.rules.push(Box::new(validation));
        let supplied = current.is_some();
        if let Some(value) = current {
            typed.value = Some(value);
        }
        let recheck = supplied || typed.getter.is_some();

        let mut update = ErrorsUpdate::starting(self.has_errors());
        if recheck {
            self.recompute_into(name, &mut update);
        }
        Ok(update)
    }

    /// Register `validation` under `name` and read the property's value
    /// through `getter` from now on. The error list is recomputed
    /// immediately.
    ///
    /// `getter` runs while the registry is borrowed and must not call back
    /// into it.
    pub fn add_with<T: 'static>(
        &mut self,
        name: &str,
        validation: impl Validation<T> + 'static,
        getter: impl Fn() -> T + 'static,
    ) -> Result<ErrorsUpdate> {
        let typed = self.typed_entry::<T>(name)?;
        typed.rules.push(Box::new(validation));
        typed.getter = Some(Box::new(getter));

        let mut update = ErrorsUpdate::starting(self.has_errors());
        self.recompute_into(name, &mut update);
        Ok(update)
    }

    /// Whether any rule is registered for `name`.
    #[must_use]
    pub fn has_rules(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Remember `value` as the current value of `name` without re-checking
    /// it. Returns `false` when nothing is registered for `name`, or when it
    /// was registered with a different value type.
    pub fn record_value<T: Clone + 'static>(&mut self, name: &str, value: &T) -> bool {
        let Some(entry) = self.rules.get_mut(name) else {
            return false;
        };
        let expected = entry.value_type();
        let Some(typed) = entry.as_any_mut().downcast_mut::<PropertyRules<T>>() else {
            tracing::warn!(
                message = "validation.type_mismatch",
                property = name,
                expected,
                actual = type_name::<T>(),
            );
            return false;
        };
        typed.value = Some(value.clone());
        true
    }

    /// Record a new value for `name` and recompute only that property.
    ///
    /// Returns `None` when nothing is registered for `name`, or when it was
    /// registered with a different value type.
    pub fn set_value<T: Clone + 'static>(&mut self, name: &str, value: &T) -> Option<ErrorsUpdate> {
        if !self.record_value(name, value) {
            return None;
        }
        let mut update = ErrorsUpdate::starting(self.has_errors());
        self.recompute_into(name, &mut update);
        Some(update)
    }

    /// Recompute every registered property from its getter or stored value.
    pub fn validate_all(&mut self) -> ErrorsUpdate {
        let mut update = ErrorsUpdate::starting(self.has_errors());
        let names: Vec<String> = self.rules.keys().cloned().collect();
        for name in names {
            self.recompute_into(&name, &mut update);
        }
        update
    }

    /// Replace the externally supplied messages for `name`. Messages from
    /// registered rules are left untouched.
    pub fn set_errors(&mut self, name: &str, messages: Vec<String>) -> ErrorsUpdate {
        let mut update = ErrorsUpdate::starting(self.has_errors());
        put(&mut self.external, name, messages);
        if self.refresh(name) {
            update.changed.push(name.to_owned());
        }
        update.has_errors = self.has_errors();
        update
    }

    /// Every active message for `name`: rule messages, then external ones.
    #[must_use]
    pub fn errors(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Names with a non-empty error list, sorted.
    pub fn invalid_properties(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// Every active message, ordered by property name.
    pub fn all_errors(&self) -> impl Iterator<Item = &str> {
        self.errors.values().flatten().map(String::as_str)
    }

    fn recompute_into(&mut self, name: &str, update: &mut ErrorsUpdate) {
        let Some(messages) = self.rules.get(name).and_then(|rules| rules.recompute()) else {
            return;
        };
        put(&mut self.own, name, messages);
        if self.refresh(name) {
            update.changed.push(name.to_owned());
        }
        update.has_errors = self.has_errors();
    }

    /// Rebuild the combined list for `name`; `true` if it changed.
    fn refresh(&mut self, name: &str) -> bool {
        let combined: Vec<String> = self
            .own
            .get(name)
            .into_iter()
            .chain(self.external.get(name))
            .flatten()
            .cloned()
            .collect();
        if combined.is_empty() {
            return self.errors.remove(name).is_some();
        }
        if self.errors.get(name) == Some(&combined) {
            return false;
        }
        self.errors.insert(name.to_owned(), combined);
        true
    }
}

fn put(map: &mut BTreeMap<String, Vec<String>>, name: &str, messages: Vec<String>) {
    if messages.is_empty() {
        map.remove(name);
    } else {
        map.insert(name.to_owned(), messages);
    }
}

/// An observable object that keeps a per-property error map.
///
/// Error-set changes are published on [`on_errors_changed`] with the
/// property name; aggregate flips raise `property_changed` for
/// [`HAS_ERRORS`] and then [`IS_VALID`].
///
/// [`on_errors_changed`]: ValidatingObject::on_errors_changed
#[derive(Debug, Default)]
pub struct ValidatingObject {
    object: ObservableObject,
    registry: RefCell<ValidationRegistry>,
    errors_changed: Event<str>,
}

impl ValidatingObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn object(&self) -> &ObservableObject {
        &self.object
    }

    pub fn add_validation<T: 'static>(
        &self,
        name: &str,
        validation: impl Validation<T> + 'static,
        current: Option<T>,
    ) -> Result<()> {
        let update = self.registry.borrow_mut().add(name, validation, current)?;
        self.publish(&update);
        Ok(())
    }

    /// Register `validation` with a getter for the live value, so that
    /// [`validate`](Self::validate) always sees the property as it is now.
    ///
    /// `getter` must not call back into this object.
    pub fn add_validation_with<T: 'static>(
        &self,
        name: &str,
        validation: impl Validation<T> + 'static,
        getter: impl Fn() -> T + 'static,
    ) -> Result<()> {
        let update = self.registry.borrow_mut().add_with(name, validation, getter)?;
        self.publish(&update);
        Ok(())
    }

    /// Equality-gated write followed by re-validation of that property only.
    pub fn set_property<T: PartialEq + Clone + 'static>(
        &self,
        name: &str,
        slot: &RefCell<T>,
        value: T,
    ) -> bool {
        if !self.object.set_property(name, slot, value) {
            return false;
        }
        self.validate_property(name, slot);
        true
    }

    /// Re-run the rules registered for `name` against the value in `slot`.
    pub fn validate_property<T: Clone + 'static>(&self, name: &str, slot: &RefCell<T>) {
        if !self.registry.borrow().has_rules(name) {
            return;
        }
        let update = {
            let value = slot.borrow();
            self.registry.borrow_mut().set_value(name, &*value)
        };
        if let Some(update) = update {
            self.publish(&update);
        }
    }

    /// Remember the value in `slot` for the next [`validate`](Self::validate)
    /// without re-checking it now.
    pub fn record_property<T: Clone + 'static>(&self, name: &str, slot: &RefCell<T>) {
        if !self.registry.borrow().has_rules(name) {
            return;
        }
        let value = slot.borrow();
        self.registry.borrow_mut().record_value(name, &*value);
    }

    /// Re-check every registered property from scratch.
    pub fn validate(&self) {
        let update = self.registry.borrow_mut().validate_all();
        self.publish(&update);
    }

    /// Replace the messages for `name` computed elsewhere. Messages from
    /// rules registered under `name` are kept alongside them.
    pub fn set_errors(&self, name: &str, messages: Vec<String>) {
        let update = self.registry.borrow_mut().set_errors(name, messages);
        self.publish(&update);
    }

    #[must_use]
    pub fn get_errors(&self, name: &str) -> Vec<String> {
        self.registry.borrow().errors(name).to_vec()
    }

    /// First message for `name`, or an empty string.
    #[must_use]
    pub fn error_for(&self, name: &str) -> String {
        self.registry
            .borrow()
            .errors(name)
            .first()
            .cloned()
            .unwrap_or_default()
    }

    /// Every active message joined by newlines.
    #[must_use]
    pub fn error(&self) -> String {
        self.registry
            .borrow()
            .all_errors()
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every active message, ordered by property name.
    #[must_use]
    pub fn all_errors(&self) -> Vec<String> {
        self.registry
            .borrow()
            .all_errors()
            .map(str::to_owned)
            .collect()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.registry.borrow().has_errors()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    #[must_use]
    pub fn has_rules(&self, name: &str) -> bool {
        self.registry.borrow().has_rules(name)
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_errors_changed(&self, handler: impl Fn(&str) + 'static) -> Subscription {
        self.errors_changed.subscribe(handler)
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_property_changed(&self, handler: impl Fn(&str) + 'static) -> Subscription {
        self.object.on_property_changed(handler)
    }

    fn publish(&self, update: &ErrorsUpdate) {
        for name in &update.changed {
            tracing::debug!(
                message = "validation.errors_changed",
                property = name.as_str(),
                errors = self.registry.borrow().errors(name).len(),
            );
            self.errors_changed.raise(name);
        }
        if update.aggregate_changed() {
            self.object.raise_property_changed(HAS_ERRORS);
            self.object.raise_property_changed(IS_VALID);
        }
    }
}
