//! Canonical schema constants for structured logging and events
//!
//! Field keys and event names shared by the engine's logging macros
//! (`log_engine_event!`, `log_engine_error!`), the capture layer that
//! lifts them back out for test assertions, and any provider that wants
//! its own logs to correlate with the engine's.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Engine identifiers
pub const FIELD_PATH: &str = "path";
pub const FIELD_IDENT: &str = "ident";
pub const FIELD_EDIT_MODE: &str = "edit_mode";
pub const FIELD_CONSTRAINT: &str = "constraint";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_STATUS: &str = "err.status";

// Canonical event names
pub const EVENT_EDIT: &str = "edit";
pub const EVENT_BEGIN_EDIT: &str = "begin_edit";
pub const EVENT_END_EDIT: &str = "end_edit";
pub const EVENT_NOTIFY: &str = "notify";
pub const EVENT_PRUNED: &str = "pruned";
pub const EVENT_FAIL: &str = "fail";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_PATH.is_empty());
        assert!(!FIELD_EDIT_MODE.is_empty());
        assert!(!FIELD_CONSTRAINT.is_empty());
        assert!(!EVENT_BEGIN_EDIT.is_empty());
        assert!(!EVENT_FAIL.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        let events = [
            EVENT_EDIT,
            EVENT_BEGIN_EDIT,
            EVENT_END_EDIT,
            EVENT_NOTIFY,
            EVENT_PRUNED,
            EVENT_FAIL,
        ];
        for (i, a) in events.iter().enumerate() {
            for b in events.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
