use thiserror::Error;

pub type Result<T> = std::result::Result<T, VmError>;

/// Errors surfaced by view-model construction and command plumbing.
///
/// Failed validation is not an error: it is recorded as data in the
/// owning object's error map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("property '{property}' is registered with value type {expected}")]
    PropertyTypeMismatch {
        property: String,
        expected: &'static str,
    },

    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("command '{command}' has no live parent view-model")]
    ParentDropped { command: String },

    #[error("command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },
}

impl VmError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }
}
