//! Trellis core — the schema-driven browsing engine
//!
//! A library for building network-managed services: applications
//! register data providers ("nodes"), and the engine marshals between
//! those providers and external clients using a schema to enforce
//! structure, typing, defaults, and access control. This crate holds:
//!
//! - The schema object model with resolution of groupings, typedefs,
//!   augments, and choice/case (`meta`)
//! - The generic `Node` abstraction adapting provider data to the
//!   schema (`node`)
//! - `Selection` traversal walking schema and data simultaneously,
//!   applying constraints and driving edits with transactional
//!   begin/end events (`node::selection`, `node::edit`)
//! - Built-in traversal constraints: depth, fields, ranges, node
//!   budgets, content filtering, default reporting (`constraints`)
//! - Format codec nodes for JSON and schema self-browsing (`codec`)
//!
//! Transport layers (RESTCONF HTTP, TLS, call-home) are external
//! collaborators consuming the URL-path and query-parameter contracts
//! exposed by `path` and `Selection::find_url`.

pub mod codec;
pub mod constraints;
pub mod errors;
pub mod logging_facility;
pub mod meta;
pub mod node;
pub mod path;

// Re-export commonly used types
pub use codec::{schema_browser, JsonReader, JsonWriter, SharedBuffer};
pub use errors::{ErrorKind, Result, TrellisError};
pub use meta::builder::ModuleBuilder;
pub use meta::types::TypeSpec;
pub use meta::{DefId, Schema};
pub use node::{BasicNode, Browser, JsonContainer, Node, Selection, Trigger};
pub use path::{Path, PathSlice};
