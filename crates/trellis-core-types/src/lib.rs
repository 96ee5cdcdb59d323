//! Core types shared across Trellis facilities
//!
//! This crate provides foundational types used by the browsing engine and
//! by anything that embeds it:
//!
//! - **Value domain**: `Format` codes, `Type` restrictions, and the tagged
//!   `Value` union with coercion from wire-shaped input
//! - **Correlation types**: RequestId, TraceId, RequestContext with
//!   cooperative cancellation
//! - **Schema constants**: Canonical field keys and event names for
//!   structured logging

pub mod correlation;
pub mod format;
pub mod schema;
pub mod value;

pub use correlation::{RequestContext, RequestId, TraceId};
pub use format::Format;
pub use value::{encode_key, EnumEntry, Type, Val, Value, ValueError};
