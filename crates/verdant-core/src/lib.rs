#![forbid(unsafe_code)]

//! Core: change notification, observable collections, validation, and
//! per-type declarative metadata for Verdant view-models.
//!
//! # Architecture
//!
//! Everything here is single-threaded and shares state through
//! `Rc<RefCell<..>>`. Event sources hold subscriber callbacks as `Weak`
//! pointers; the [`Subscription`] guard returned by `subscribe()` owns the
//! strong side. An event source therefore never keeps its observers alive.
//!
//! # Invariants
//!
//! 1. Writing a value equal to the current one raises nothing.
//! 2. Subscribers are notified in registration order.
//! 3. No `RefCell` borrow is held while a handler runs.
//! 4. `has_errors()` is true iff at least one property has a non-empty
//!    error list, and `is_valid()` is always its negation.

pub mod collection;
pub mod error;
pub mod event;
pub mod logging;
pub mod metadata;
pub mod observable;
pub mod property;
pub mod validating;
pub mod validation;

pub use collection::{CollectionChange, ObservableCollection};
pub use error::{Result, VmError};
pub use event::{Event, Subscription};
pub use metadata::{DeclareMetadata, MetadataBuilder, TypeMetadata, metadata_for};
pub use observable::ObservableObject;
pub use validating::{ErrorsUpdate, ValidatingObject, ValidationRegistry};
pub use validation::{PredicateValidation, Validation};
