#![forbid(unsafe_code)]

//! Stateless validation rules.

use std::fmt;

use crate::error::{Result, VmError};

/// Message used when a rule is built without one.
pub const DEFAULT_MESSAGE: &str = "value is invalid";

/// A pure rule over values of type `T`.
pub trait Validation<T: ?Sized> {
    /// Whether `value` satisfies the rule.
    fn validate(&self, value: &T) -> bool;

    /// Message describing why `value` failed.
    fn error_message(&self, value: &T) -> String;
}

/// Boxed predicate accepted by [`PredicateValidation::from_parts`].
pub type Predicate<T> = Box<dyn Fn(&T) -> bool>;

enum Message<T: ?Sized> {
    Fixed(String),
    Dynamic(Box<dyn Fn(&T) -> String>),
}

/// A rule backed by a predicate closure.
///
/// # Example
///
/// ```
/// use verdant_core::{PredicateValidation, Validation};
///
/// let at_least_five = PredicateValidation::new(|v: &i32| *v >= 5, "Value has to be at least 5");
/// assert!(!at_least_five.validate(&4));
/// assert!(at_least_five.validate(&5));
/// ```
pub struct PredicateValidation<T: ?Sized> {
    predicate: Predicate<T>,
    message: Message<T>,
}

impl<T: ?Sized> PredicateValidation<T> {
    pub fn new(predicate: impl Fn(&T) -> bool + 'static, message: impl Into<String>) -> Self {
        Self {
            predicate: Box::new(predicate),
            message: Message::Fixed(message.into()),
        }
    }

    /// Rule whose message is derived from the rejected value.
    pub fn with_message_fn(
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Fn(&T) -> String + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            message: Message::Dynamic(Box::new(message)),
        }
    }

    /// Rule reporting [`DEFAULT_MESSAGE`].
    pub fn without_message(predicate: impl Fn(&T) -> bool + 'static) -> Self {
        Self::new(predicate, DEFAULT_MESSAGE)
    }

    /// Build from an optional predicate; a missing predicate is rejected
    /// with [`VmError::InvalidArgument`].
    pub fn from_parts(predicate: Option<Predicate<T>>, message: impl Into<String>) -> Result<Self> {
        let predicate = predicate.ok_or_else(|| VmError::invalid("predicate is required"))?;
        Ok(Self {
            predicate,
            message: Message::Fixed(message.into()),
        })
    }
}

impl<T: ?Sized> Validation<T> for PredicateValidation<T> {
    fn validate(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    fn error_message(&self, value: &T) -> String {
        match &self.message {
            Message::Fixed(text) => text.clone(),
            Message::Dynamic(render) => render(value),
        }
    }
}

impl<T: ?Sized> fmt::Debug for PredicateValidation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match &self.message {
            Message::Fixed(text) => text.as_str(),
            Message::Dynamic(_) => "<dynamic>",
        };
        f.debug_struct("PredicateValidation")
            .field("message", &message)
            .finish_non_exhaustive()
    }
}
