#![forbid(unsafe_code)]

//! Dirty tracking and change propagation.
//!
//! # Design
//!
//! [`ViewModel`] is a cheaply cloneable handle to shared state. Application
//! view-models embed one and route their property writes through
//! [`ViewModel::set_property`], which fans a single successful write out to
//! every interested party in a fixed order:
//!
//! 1. `property_changed(name)`
//! 2. `property_changed("is_dirty")` if the dirty flag transitions
//! 3. can-execute-changed on every registered command depending on `name`
//! 4. `errors_changed(name)`, then `has_errors` / `is_valid` if they flip
//!
//! Tracked collections and child view-models feed step 2 through their own
//! notifications. Every subscription the view-model makes captures only a
//! `Weak` pointer back to it, and the parent link is `Weak` as well, so no
//! graph of view-models keeps itself alive.
//!
//! # Invariants
//!
//! 1. Equal-value writes raise nothing and never touch the dirty flag.
//! 2. The dirty flag only ever clears through [`ViewModel::set_is_dirty`].
//! 3. Writes to `parent` and `is_read_only` never dirty the object.
//! 4. While read-only, [`ViewModel::set_property`] is a complete no-op.
//! 5. Names declared `dirty_ignored` notify normally but never dirty.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use ahash::AHashMap;
use verdant_core::property::{IS_DIRTY, IS_READ_ONLY, PARENT, is_framework_property};
use verdant_core::{
    CollectionChange, DeclareMetadata, ObservableCollection, ObservableObject, Result,
    Subscription, TypeMetadata, ValidatingObject, Validation, metadata_for,
};

use crate::command::AnyCommand;
use crate::config::ViewModelConfig;

struct ViewModelInner {
    validating: ValidatingObject,
    metadata: Arc<TypeMetadata>,
    config: ViewModelConfig,
    is_dirty: Cell<bool>,
    is_read_only: Cell<bool>,
    parent: RefCell<Option<Weak<ViewModelInner>>>,
    /// Tracked source name to the subscriptions hooking it.
    tracked: RefCell<BTreeMap<String, Vec<Subscription>>>,
    commands: RefCell<BTreeMap<String, Rc<dyn AnyCommand>>>,
    /// Property name to names of the commands depending on it.
    dependencies: RefCell<AHashMap<String, Vec<String>>>,
}

/// Shared handle to a view-model's tracking state.
///
/// Cloning creates another handle to the **same** state; equality is
/// identity.
#[derive(Clone)]
pub struct ViewModel {
    inner: Rc<ViewModelInner>,
}

/// Non-owning handle to a [`ViewModel`].
#[derive(Clone, Default)]
pub struct WeakViewModel {
    inner: Weak<ViewModelInner>,
}

impl WeakViewModel {
    #[must_use]
    pub fn upgrade(&self) -> Option<ViewModel> {
        self.inner.upgrade().map(|inner| ViewModel { inner })
    }
}

impl fmt::Debug for WeakViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakViewModel")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl PartialEq for ViewModel {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ViewModel {}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("type_name", &self.inner.metadata.type_name())
            .field("is_dirty", &self.inner.is_dirty.get())
            .field("is_read_only", &self.inner.is_read_only.get())
            .field("has_parent", &self.parent().is_some())
            .field("commands", &self.command_names())
            .finish()
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewModel {
    // ── Constructors ─────────────────────────────────────────────────

    /// A view-model with no exemptions and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(TypeMetadata::empty(), ViewModelConfig::default())
    }

    /// A view-model whose exemptions come from `M`'s declaration.
    #[must_use]
    pub fn for_type<M: DeclareMetadata>() -> Self {
        Self::build(metadata_for::<M>(), ViewModelConfig::default())
    }

    #[must_use]
    pub fn with_config<M: DeclareMetadata>(config: ViewModelConfig) -> Self {
        Self::build(metadata_for::<M>(), config)
    }

    fn build(metadata: Arc<TypeMetadata>, config: ViewModelConfig) -> Self {
        Self {
            inner: Rc::new(ViewModelInner {
                validating: ValidatingObject::new(),
                metadata,
                config,
                is_dirty: Cell::new(false),
                is_read_only: Cell::new(config.read_only),
                parent: RefCell::new(None),
                tracked: RefCell::new(BTreeMap::new()),
                commands: RefCell::new(BTreeMap::new()),
                dependencies: RefCell::new(AHashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakViewModel {
        WeakViewModel {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn config(&self) -> ViewModelConfig {
        self.inner.config
    }

    #[must_use]
    pub fn metadata(&self) -> &TypeMetadata {
        &self.inner.metadata
    }

    fn object(&self) -> &ObservableObject {
        self.inner.validating.object()
    }

    // ── Property writes ──────────────────────────────────────────────

    /// Write `value` into `slot` and propagate the change.
    ///
    /// Returns `true` only when the stored value changed. Read-only
    /// view-models and equal values return `false` without side effects.
    ///
    /// Collection-valued properties should go through
    /// [`set_collection_property`](Self::set_collection_property): this
    /// setter stores a new [`ObservableCollection`] but keeps the old
    /// instance as the tracked source.
    pub fn set_property<T: PartialEq + Clone + 'static>(
        &self,
        name: &str,
        slot: &RefCell<T>,
        value: T,
    ) -> bool {
        if self.inner.is_read_only.get() {
            tracing::trace!(message = "view_model.read_only_write", property = name);
            return false;
        }
        if !ObservableObject::replace_if_changed(slot, value) {
            return false;
        }
        self.object().raise_property_changed(name);
        self.mark_dirty_from(name);
        self.notify_commands(name);
        if self.inner.config.validate_on_write {
            self.inner.validating.validate_property(name, slot);
        } else {
            self.inner.validating.record_property(name, slot);
        }
        true
    }

    /// [`set_property`](Self::set_property) for a collection-valued
    /// property; on change the new instance replaces the old one as the
    /// tracked source for `name`.
    pub fn set_collection_property<T: 'static>(
        &self,
        name: &str,
        slot: &RefCell<ObservableCollection<T>>,
        value: ObservableCollection<T>,
    ) -> bool {
        if !self.set_property(name, slot, value) {
            return false;
        }
        let current = slot.borrow().clone();
        self.track_collection(name, &current);
        true
    }

    /// Raise `property_changed` for a computed property.
    pub fn raise_property_changed(&self, name: &str) {
        self.object().raise_property_changed(name);
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_property_changed(&self, handler: impl Fn(&str) + 'static) -> Subscription {
        self.object().on_property_changed(handler)
    }

    // ── Dirty state ──────────────────────────────────────────────────

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty.get()
    }

    /// Set the dirty flag directly; this is the only way to clear it.
    pub fn set_is_dirty(&self, dirty: bool) -> bool {
        if self.inner.is_dirty.replace(dirty) == dirty {
            return false;
        }
        self.object().raise_property_changed(IS_DIRTY);
        true
    }

    /// Whether writes to (or mutations of) `name` are exempt from dirty
    /// tracking.
    #[must_use]
    pub fn is_dirty_ignored(&self, name: &str) -> bool {
        self.inner.metadata.is_dirty_ignored(name)
    }

    fn mark_dirty_from(&self, source: &str) {
        if !self.inner.config.dirty_tracking
            || is_framework_property(source)
            || self.is_dirty_ignored(source)
        {
            tracing::trace!(message = "view_model.dirty_skipped", source);
            return;
        }
        let transitioned = self.set_is_dirty(true);
        tracing::debug!(message = "view_model.dirty", source, transitioned);
    }

    // ── Read-only guard ──────────────────────────────────────────────

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.is_read_only.get()
    }

    /// Toggle the read-only guard. Never dirties the object.
    pub fn set_read_only(&self, read_only: bool) -> bool {
        if self.inner.is_read_only.replace(read_only) == read_only {
            return false;
        }
        self.object().raise_property_changed(IS_READ_ONLY);
        true
    }

    // ── Parent link ──────────────────────────────────────────────────

    /// The parent, if one is set and still alive.
    #[must_use]
    pub fn parent(&self) -> Option<ViewModel> {
        self.inner
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| ViewModel { inner })
    }

    /// Replace the parent link. Raises `parent` on change; never dirties the
    /// object. A parent that has been dropped compares equal to `None`.
    pub fn set_parent(&self, parent: Option<&ViewModel>) -> bool {
        let next = parent.map(|p| Rc::downgrade(&p.inner));
        {
            let mut current = self.inner.parent.borrow_mut();
            let live = current.as_ref().filter(|weak| weak.strong_count() > 0);
            let same = match (live, next.as_ref()) {
                (None, None) => true,
                (Some(a), Some(b)) => Weak::ptr_eq(a, b),
                _ => false,
            };
            if same {
                return false;
            }
            *current = next;
        }
        self.object().raise_property_changed(PARENT);
        true
    }

    // ── Tracked sources ──────────────────────────────────────────────

    /// Dirty this view-model whenever `collection`'s contents change,
    /// unless `name` is exempt. Replaces any earlier source tracked under
    /// `name`.
    pub fn track_collection<T: 'static>(&self, name: &str, collection: &ObservableCollection<T>) {
        let weak = Rc::downgrade(&self.inner);
        let source = name.to_owned();
        let sub = collection.on_changed(move |change: &CollectionChange| {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!(message = "view_model.tracked_changed", source = source.as_str(), ?change);
                ViewModel { inner }.mark_dirty_from(&source);
            }
        });
        self.replace_tracked(name, vec![sub]);
    }

    /// Track a child view-model under `name`.
    ///
    /// The child's parent is set to this view-model. When the child becomes
    /// dirty this one does too (unless `name` is exempt), and the child's
    /// active error messages are mirrored into this view-model's error map
    /// under `name`, after any messages from this view-model's own rules for
    /// `name`.
    pub fn track_child(&self, name: &str, child: &ViewModel) {
        child.set_parent(Some(self));

        let owner = Rc::downgrade(&self.inner);
        let weak_child = child.downgrade();
        let source = name.to_owned();
        let dirty_sub = child.on_property_changed(move |property| {
            if property != IS_DIRTY {
                return;
            }
            let (Some(inner), Some(child)) = (owner.upgrade(), weak_child.upgrade()) else {
                return;
            };
            if child.is_dirty() {
                ViewModel { inner }.mark_dirty_from(&source);
            }
        });

        let owner = Rc::downgrade(&self.inner);
        let weak_child = child.downgrade();
        let source = name.to_owned();
        let errors_sub = child.on_errors_changed(move |_| {
            let (Some(inner), Some(child)) = (owner.upgrade(), weak_child.upgrade()) else {
                return;
            };
            inner.validating.set_errors(&source, child.all_errors());
        });

        self.replace_tracked(name, vec![dirty_sub, errors_sub]);
        self.inner.validating.set_errors(name, child.all_errors());
    }

    /// Stop tracking `name`. Mirrored child errors under `name` are cleared;
    /// errors from this view-model's own rules stay.
    pub fn untrack(&self, name: &str) -> bool {
        let removed = self.inner.tracked.borrow_mut().remove(name);
        if removed.is_none() {
            return false;
        }
        drop(removed);
        self.inner.validating.set_errors(name, Vec::new());
        true
    }

    #[must_use]
    pub fn tracked_names(&self) -> Vec<String> {
        self.inner.tracked.borrow().keys().cloned().collect()
    }

    fn replace_tracked(&self, name: &str, subs: Vec<Subscription>) {
        let previous = self
            .inner
            .tracked
            .borrow_mut()
            .insert(name.to_owned(), subs);
        drop(previous);
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Add `command` to the registry under its name and wire its declared
    /// sources into the dependency table. A command already registered
    /// under that name is replaced along with its edges.
    pub fn register_command(&self, command: Rc<dyn AnyCommand>) {
        let name = command.name().to_owned();
        let sources: Vec<&'static str> = command.can_execute_sources().to_vec();
        let previous = self
            .inner
            .commands
            .borrow_mut()
            .insert(name.clone(), command);
        {
            let mut deps = self.inner.dependencies.borrow_mut();
            remove_edges(&mut deps, &name);
            for source in sources {
                deps.entry(source.to_owned()).or_default().push(name.clone());
            }
        }
        drop(previous);
    }

    pub fn remove_command(&self, name: &str) -> Option<Rc<dyn AnyCommand>> {
        let removed = self.inner.commands.borrow_mut().remove(name)?;
        remove_edges(&mut self.inner.dependencies.borrow_mut(), name);
        Some(removed)
    }

    #[must_use]
    pub fn command(&self, name: &str) -> Option<Rc<dyn AnyCommand>> {
        self.inner.commands.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.inner.commands.borrow().keys().cloned().collect()
    }

    /// Names of the registered commands that depend on `property`.
    #[must_use]
    pub fn dependent_commands(&self, property: &str) -> Vec<String> {
        self.inner
            .dependencies
            .borrow()
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    /// Raise can-execute-changed on every registered command depending on
    /// `property`.
    pub fn notify_commands(&self, property: &str) {
        let targets: Vec<Rc<dyn AnyCommand>> = {
            let deps = self.inner.dependencies.borrow();
            let Some(names) = deps.get(property) else {
                return;
            };
            let commands = self.inner.commands.borrow();
            names
                .iter()
                .filter_map(|name| commands.get(name).cloned())
                .collect()
        };
        for command in targets {
            command.raise_can_execute_changed();
        }
    }

    // ── Validation ───────────────────────────────────────────────────

    #[must_use]
    pub fn validating(&self) -> &ValidatingObject {
        &self.inner.validating
    }

    pub fn add_validation<T: 'static>(
        &self,
        name: &str,
        validation: impl Validation<T> + 'static,
        current: Option<T>,
    ) -> Result<()> {
        self.inner.validating.add_validation(name, validation, current)
    }

    /// Register a rule that reads the property's live value through
    /// `getter` whenever it is checked.
    pub fn add_validation_with<T: 'static>(
        &self,
        name: &str,
        validation: impl Validation<T> + 'static,
        getter: impl Fn() -> T + 'static,
    ) -> Result<()> {
        self.inner
            .validating
            .add_validation_with(name, validation, getter)
    }

    /// Re-check every registered property against its current value.
    pub fn validate(&self) {
        self.inner.validating.validate();
    }

    #[must_use]
    pub fn get_errors(&self, name: &str) -> Vec<String> {
        self.inner.validating.get_errors(name)
    }

    /// First message for `name`, or an empty string.
    #[must_use]
    pub fn error_for(&self, name: &str) -> String {
        self.inner.validating.error_for(name)
    }

    #[must_use]
    pub fn error(&self) -> String {
        self.inner.validating.error()
    }

    #[must_use]
    pub fn all_errors(&self) -> Vec<String> {
        self.inner.validating.all_errors()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.inner.validating.has_errors()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.validating.is_valid()
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_errors_changed(&self, handler: impl Fn(&str) + 'static) -> Subscription {
        self.inner.validating.on_errors_changed(handler)
    }
}

fn remove_edges(deps: &mut AHashMap<String, Vec<String>>, command: &str) {
    for names in deps.values_mut() {
        names.retain(|name| name != command);
    }
    deps.retain(|_, names| !names.is_empty());
}
