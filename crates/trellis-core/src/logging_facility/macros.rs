//! Canonical logging macros
//!
//! Every structured event the engine emits goes through these macros so
//! the field keys and event names stay the canonical ones from
//! `trellis_core_types::schema`. The capture layer relies on that when
//! lifting events back out for assertions.

/// Emit one engine event: canonical component/event/path fields plus any
/// extra `key = value` pairs.
///
/// # Example
///
/// ```
/// # use trellis_core::log_engine_event;
/// # let path = "/car/engine";
/// log_engine_event!(trellis_core_types::schema::EVENT_BEGIN_EDIT, path);
/// log_engine_event!(trellis_core_types::schema::EVENT_PRUNED, path, constraint = "depth");
/// ```
#[macro_export]
macro_rules! log_engine_event {
    ($event:expr, $path:expr) => {
        tracing::debug!(
            component = module_path!(),
            event = $event,
            path = %$path,
        );
    };
    ($event:expr, $path:expr, $($field:tt)*) => {
        tracing::debug!(
            component = module_path!(),
            event = $event,
            path = %$path,
            $($field)*
        );
    };
}

/// Emit a failed engine step with its error classification attached
///
/// # Example
///
/// ```
/// # use trellis_core::{log_engine_error, TrellisError};
/// let err = TrellisError::ItemNotFound { path: "/p=waldo".to_string() };
/// log_engine_error!(err, "/p=waldo");
/// ```
#[macro_export]
macro_rules! log_engine_error {
    ($err:expr, $path:expr) => {
        tracing::warn!(
            component = module_path!(),
            event = trellis_core_types::schema::EVENT_FAIL,
            path = %$path,
            "err.kind" = ?$err.kind(),
            "err.status" = $err.status(),
        );
    };
}
