//! Structured logging setup.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the host application's job. With the `tracing-json` feature this
//! module offers a ready-made JSON subscriber filtered by `RUST_LOG`
//! (falling back to [`DEFAULT_FILTER`]).
//!
//! Event names used across the workspace:
//!
//! | message | level | fields |
//! |---|---|---|
//! | `property.changed` | trace | `property` |
//! | `collection.changed` | trace | `change` |
//! | `metadata.built` | debug | `type_name`, counts |
//! | `validation.errors_changed` | debug | `property`, `errors` |
//! | `validation.type_mismatch` | warn | `property`, `expected`, `actual` |
//! | `view_model.dirty` | debug | `source`, `transitioned` |
//! | `view_model.dirty_skipped` | trace | `source` |
//! | `view_model.tracked_changed` | trace | `source`, `change` |
//! | `view_model.read_only_write` | trace | `property` |
//! | `command.can_execute_changed` | trace | `command` |
//! | `command.execute` | debug | `command` |

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "verdant_core=info,verdant_viewmodel=info";

/// Install a global JSON subscriber. Returns `false` if one was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
