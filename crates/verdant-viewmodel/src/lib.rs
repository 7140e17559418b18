#![forbid(unsafe_code)]

//! View-model runtime: dirty tracking, change propagation, and commands.
//!
//! - [`ViewModel`]: shared tracking core embedded by application
//!   view-models. Owns the dirty flag, read-only guard, weak parent link,
//!   tracked collections and children, command registry, dependency table,
//!   and a composed [`ValidatingObject`](verdant_core::ValidatingObject).
//! - [`Command`]: a [`CommandBehavior`] bound to a parent view-model whose
//!   can-execute-changed event follows declared parent properties.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use verdant_core::{DeclareMetadata, MetadataBuilder, Result};
//! use verdant_viewmodel::{Command, CommandBehavior, HasViewModel, Parameter, ViewModel};
//!
//! struct Document {
//!     base: ViewModel,
//!     title: RefCell<String>,
//! }
//!
//! impl HasViewModel for Document {
//!     fn view_model(&self) -> &ViewModel {
//!         &self.base
//!     }
//! }
//!
//! struct Save;
//!
//! impl DeclareMetadata for Save {
//!     fn declare(meta: &mut MetadataBuilder) {
//!         meta.can_execute_source("title");
//!     }
//! }
//!
//! impl CommandBehavior<Document> for Save {
//!     fn can_execute(&self, doc: &Document, _: Parameter<'_>) -> bool {
//!         !doc.title.borrow().is_empty()
//!     }
//!
//!     fn execute(&self, doc: &Document, _: Parameter<'_>) -> Result<()> {
//!         doc.base.set_is_dirty(false);
//!         Ok(())
//!     }
//! }
//!
//! let doc = Rc::new(Document { base: ViewModel::new(), title: RefCell::new(String::new()) });
//! let save = Command::new(&doc, Save);
//! assert!(!save.can_execute(None));
//!
//! doc.base.set_property("title", &doc.title, "Draft".to_owned());
//! assert!(doc.base.is_dirty());
//! assert!(save.can_execute(None));
//!
//! save.execute(None).unwrap();
//! assert!(!doc.base.is_dirty());
//! ```

pub mod command;
pub mod config;
pub mod view_model;

pub use command::{AnyCommand, Command, CommandBehavior, HasViewModel, Parameter};
pub use config::ViewModelConfig;
pub use view_model::{ViewModel, WeakViewModel};
