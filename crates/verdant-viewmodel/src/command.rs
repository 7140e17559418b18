#![forbid(unsafe_code)]

//! Commands bound to a parent view-model.
//!
//! A command pairs a [`CommandBehavior`] (the application's predicate and
//! action) with a weak link to the view-model it operates on. Its
//! executability depends on parent properties named in the behavior's
//! static [`DeclareMetadata`] declaration; those names become edges in the
//! parent's dependency table when the command registers itself, and every
//! changed write to one of them raises the command's can-execute-changed
//! event.
//!
//! # Ownership
//!
//! The parent's registry owns the command; the command only holds a `Weak`
//! reference to its parent. Once the parent is dropped `can_execute()`
//! reports `false` and `execute()` fails with [`VmError::ParentDropped`].

use std::any::{Any, type_name};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use verdant_core::{
    DeclareMetadata, Event, Result, Subscription, TypeMetadata, VmError, metadata_for,
};

use crate::view_model::ViewModel;

/// Opaque command argument.
pub type Parameter<'a> = Option<&'a dyn Any>;

/// Access to the tracking core embedded in an application view-model.
pub trait HasViewModel {
    fn view_model(&self) -> &ViewModel;
}

impl HasViewModel for ViewModel {
    fn view_model(&self) -> &ViewModel {
        self
    }
}

/// Application logic behind a command.
///
/// Dependencies on parent properties are declared through
/// [`DeclareMetadata::declare`] with
/// [`MetadataBuilder::can_execute_source`](verdant_core::MetadataBuilder::can_execute_source).
pub trait CommandBehavior<VM>: DeclareMetadata {
    fn can_execute(&self, _view_model: &VM, _parameter: Parameter<'_>) -> bool {
        true
    }

    fn execute(&self, view_model: &VM, parameter: Parameter<'_>) -> Result<()>;
}

/// Type-erased view of a command, as held by a parent's registry.
pub trait AnyCommand {
    fn name(&self) -> &str;

    /// Parent property names this command depends on.
    fn can_execute_sources(&self) -> &[&'static str];

    fn can_execute(&self, parameter: Parameter<'_>) -> bool;

    fn execute(&self, parameter: Parameter<'_>) -> Result<()>;

    fn raise_can_execute_changed(&self);

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    fn on_can_execute_changed(&self, handler: Box<dyn Fn()>) -> Subscription;
}

struct CommandInner<VM: 'static> {
    name: String,
    parent: Weak<VM>,
    metadata: Arc<TypeMetadata>,
    behavior: Box<dyn CommandBehavior<VM>>,
    can_execute_changed: Event<()>,
}

impl<VM: 'static> AnyCommand for CommandInner<VM> {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_execute_sources(&self) -> &[&'static str] {
        self.metadata.can_execute_sources()
    }

    fn can_execute(&self, parameter: Parameter<'_>) -> bool {
        self.parent
            .upgrade()
            .is_some_and(|parent| self.behavior.can_execute(&parent, parameter))
    }

    fn execute(&self, parameter: Parameter<'_>) -> Result<()> {
        let parent = self.parent.upgrade().ok_or_else(|| VmError::ParentDropped {
            command: self.name.clone(),
        })?;
        tracing::debug!(message = "command.execute", command = self.name.as_str());
        self.behavior.execute(&parent, parameter)
    }

    fn raise_can_execute_changed(&self) {
        tracing::trace!(message = "command.can_execute_changed", command = self.name.as_str());
        self.can_execute_changed.raise(&());
    }

    fn on_can_execute_changed(&self, handler: Box<dyn Fn()>) -> Subscription {
        self.can_execute_changed.subscribe(move |_| handler())
    }
}

/// Handle to a command registered with its parent view-model.
pub struct Command<VM: 'static> {
    inner: Rc<CommandInner<VM>>,
}

impl<VM: 'static> Clone for Command<VM> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<VM: 'static> fmt::Debug for Command<VM> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.inner.name)
            .field("sources", &self.inner.metadata.can_execute_sources())
            .field("parent_alive", &(self.inner.parent.strong_count() > 0))
            .finish()
    }
}

impl<VM: HasViewModel + 'static> Command<VM> {
    /// Bind `behavior` to `parent` and register it in the parent's command
    /// registry and dependency table.
    pub fn new<B: CommandBehavior<VM>>(parent: &Rc<VM>, behavior: B) -> Self {
        let inner = Rc::new(CommandInner {
            name: short_type_name::<B>(),
            parent: Rc::downgrade(parent),
            metadata: metadata_for::<B>(),
            behavior: Box::new(behavior),
            can_execute_changed: Event::new(),
        });
        let command = Self { inner };
        parent.view_model().register_command(command.as_any());
        command
    }
}

impl<VM: 'static> Command<VM> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<Rc<VM>> {
        self.inner.parent.upgrade()
    }

    #[must_use]
    pub fn can_execute_sources(&self) -> &[&'static str] {
        self.inner.metadata.can_execute_sources()
    }

    #[must_use]
    pub fn can_execute(&self, parameter: Parameter<'_>) -> bool {
        AnyCommand::can_execute(&*self.inner, parameter)
    }

    pub fn execute(&self, parameter: Parameter<'_>) -> Result<()> {
        AnyCommand::execute(&*self.inner, parameter)
    }

    /// Ask bound controls to re-query [`can_execute`](Self::can_execute).
    pub fn raise_can_execute_changed(&self) {
        self.inner.raise_can_execute_changed();
    }

    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn on_can_execute_changed(&self, handler: impl Fn() + 'static) -> Subscription {
        self.inner.can_execute_changed.subscribe(move |_| handler())
    }

    /// The type-erased form stored in registries.
    #[must_use]
    pub fn as_any(&self) -> Rc<dyn AnyCommand> {
        self.inner.clone()
    }
}

/// `my_app::commands::SaveCommand<T>` becomes `SaveCommand`.
fn short_type_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use verdant_core::MetadataBuilder;

    struct Toggle {
        base: ViewModel,
        flag: RefCell<bool>,
        runs: Cell<u32>,
    }

    impl HasViewModel for Toggle {
        fn view_model(&self) -> &ViewModel {
            &self.base
        }
    }

    impl Toggle {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                base: ViewModel::new(),
                flag: RefCell::new(false),
                runs: Cell::new(0),
            })
        }

        fn set_flag(&self, value: bool) -> bool {
            self.base.set_property("flag", &self.flag, value)
        }
    }

    struct RunCommand;

    impl DeclareMetadata for RunCommand {
        fn declare(meta: &mut MetadataBuilder) {
            meta.can_execute_source("flag");
        }
    }

    impl CommandBehavior<Toggle> for RunCommand {
        fn can_execute(&self, vm: &Toggle, _parameter: Parameter<'_>) -> bool {
            *vm.flag.borrow()
        }

        fn execute(&self, vm: &Toggle, parameter: Parameter<'_>) -> Result<()> {
            let step = parameter
                .and_then(|p| p.downcast_ref::<u32>())
                .copied()
                .unwrap_or(1);
            vm.runs.set(vm.runs.get() + step);
            Ok(())
        }
    }

    struct Failing;
    impl DeclareMetadata for Failing {}
    impl CommandBehavior<ViewModel> for Failing {
        fn execute(&self, _vm: &ViewModel, _parameter: Parameter<'_>) -> Result<()> {
            Err(VmError::command_failed("Failing", "nope"))
        }
    }

    #[test]
    fn name_is_short_type_name() {
        assert_eq!(short_type_name::<RunCommand>(), "RunCommand");
        assert_eq!(short_type_name::<Vec<RunCommand>>(), "Vec");
    }

    #[test]
    fn registers_itself_with_parent() {
        let vm = Toggle::new();
        let command = Command::new(&vm, RunCommand);
        assert_eq!(vm.base.command_names(), vec!["RunCommand".to_owned()]);
        assert_eq!(vm.base.dependent_commands("flag"), vec!["RunCommand".to_owned()]);
        assert_eq!(command.can_execute_sources(), &["flag"]);
        assert!(Rc::ptr_eq(&command.parent().expect("alive"), &vm));
    }

    #[test]
    fn flag_change_fires_once_and_enables() {
        let vm = Toggle::new();
        let command = Command::new(&vm, RunCommand);
        assert!(!command.can_execute(None));

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let _sub = command.on_can_execute_changed(move || counter.set(counter.get() + 1));

        assert!(vm.set_flag(true));
        assert_eq!(fired.get(), 1);
        assert!(command.can_execute(None));

        assert!(!vm.set_flag(true));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn execute_passes_parameter() {
        let vm = Toggle::new();
        let command = Command::new(&vm, RunCommand);
        command.execute(None).expect("runs");
        command.execute(Some(&5u32 as &dyn Any)).expect("runs");
        assert_eq!(vm.runs.get(), 6);
    }

    #[test]
    fn dropped_parent_disables_command() {
        let command = {
            let vm = Toggle::new();
            Command::new(&vm, RunCommand)
        };
        assert!(command.parent().is_none());
        assert!(!command.can_execute(None));
        assert_eq!(
            command.execute(None),
            Err(VmError::ParentDropped {
                command: "RunCommand".into()
            })
        );
    }

    #[test]
    fn behavior_errors_propagate() {
        let vm = Rc::new(ViewModel::new());
        let command = Command::new(&vm, Failing);
        assert!(command.can_execute(None));
        assert!(matches!(
            command.execute(None),
            Err(VmError::CommandFailed { .. })
        ));
    }

    #[test]
    fn direct_raise_and_erased_subscription() {
        let vm = Toggle::new();
        let command = Command::new(&vm, RunCommand);
        let erased = vm.base.command("RunCommand").expect("registered");

        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let _sub = erased.on_can_execute_changed(Box::new(move || counter.set(counter.get() + 1)));

        command.raise_can_execute_changed();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn removed_command_is_not_notified() {
        let vm = Toggle::new();
        let command = Command::new(&vm, RunCommand);
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let _sub = command.on_can_execute_changed(move || counter.set(counter.get() + 1));

        assert!(vm.base.remove_command("RunCommand").is_some());
        assert!(vm.base.dependent_commands("flag").is_empty());
        vm.set_flag(true);
        assert_eq!(fired.get(), 0);

        vm.base.register_command(command.as_any());
        vm.set_flag(false);
        assert_eq!(fired.get(), 1);
    }
}
