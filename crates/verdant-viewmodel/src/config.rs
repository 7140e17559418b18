/// Construction-time options for a [`ViewModel`](crate::ViewModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewModelConfig {
    /// Re-run a property's rules on every successful write to it.
    pub validate_on_write: bool,
    /// Initial state of the read-only guard.
    pub read_only: bool,
    /// Whether writes and tracked mutations raise the dirty flag.
    pub dirty_tracking: bool,
}

impl Default for ViewModelConfig {
    fn default() -> Self {
        Self {
            validate_on_write: true,
            read_only: false,
            dirty_tracking: true,
        }
    }
}

impl ViewModelConfig {
    #[must_use]
    pub fn with_validate_on_write(mut self, enabled: bool) -> Self {
        self.validate_on_write = enabled;
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn with_dirty_tracking(mut self, enabled: bool) -> Self {
        self.dirty_tracking = enabled;
        self
    }
}
