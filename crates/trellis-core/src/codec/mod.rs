//! Format codec nodes
//!
//! Readers and writers are just `Node`s: a reader projects a decoded
//! payload as a read-only provider the editor can copy from; a writer
//! receives the editor's creation and field calls and streams encoded
//! output. Either side survives schema fields missing from the payload.

pub mod json_read;
pub mod json_write;
pub mod schema_node;

pub use json_read::JsonReader;
pub use json_write::{JsonWriter, SharedBuffer};
pub use schema_node::schema_browser;
