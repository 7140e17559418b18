//! Names of the framework-managed properties.
//!
//! These are the names carried by `property_changed` notifications for the
//! aggregate state a binding layer observes.

/// Raised when the dirty flag transitions.
pub const IS_DIRTY: &str = "is_dirty";
/// Raised when the read-only guard is toggled.
pub const IS_READ_ONLY: &str = "is_read_only";
/// Raised when the parent link changes.
pub const PARENT: &str = "parent";
/// Raised when the aggregate error state flips.
pub const HAS_ERRORS: &str = "has_errors";
/// Raised together with [`HAS_ERRORS`].
pub const IS_VALID: &str = "is_valid";

/// Whether `name` is one of the framework-managed properties above.
#[must_use]
pub fn is_framework_property(name: &str) -> bool {
    matches!(name, IS_DIRTY | IS_READ_ONLY | PARENT | HAS_ERRORS | IS_VALID)
}
