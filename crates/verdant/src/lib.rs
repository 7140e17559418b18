#![forbid(unsafe_code)]

//! Verdant public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use verdant_core;
pub use verdant_viewmodel;

pub mod prelude {
    pub use verdant_core::property;
    pub use verdant_core::{
        CollectionChange, DeclareMetadata, MetadataBuilder, ObservableCollection,
        PredicateValidation, Result, Subscription, Validation, VmError,
    };
    pub use verdant_viewmodel::{
        Command, CommandBehavior, HasViewModel, Parameter, ViewModel, ViewModelConfig,
    };
}
