//! Logging facility for the browsing engine
//!
//! Engine modules emit structured events through `log_engine_event!` and
//! `log_engine_error!`, which pin the field keys and event names to the
//! canonical constants in `trellis_core_types::schema` (edit cycles,
//! constraint prunes, failed steps). `init` picks once how those events
//! leave the process; the Test profile routes them to `capture` where
//! suites assert on them by key.

pub mod capture;
pub mod init;
pub mod macros;

pub use capture::{CapturedEvent, EventCapture};
pub use init::{init, Profile};
