//! Node contract
//!
//! `Node` is the seam between the engine and a provider: it adapts one
//! live data object to one schema position. The engine makes no
//! assumption beyond this contract; providers project native records,
//! maps, reflective bindings, or serial streams.
//!
//! Most operations have usable defaults: reads answer "absent", writes
//! refuse. A provider implements only what its data supports.

pub mod basic;
pub mod browser;
pub mod edit;
pub mod json_container;
pub mod selection;

use std::any::Any;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::errors::{Result, TrellisError};
use crate::meta::DefId;
use trellis_core_types::Value;

pub use basic::BasicNode;
pub use browser::{Browser, Trigger};
pub use edit::Strategy;
pub use json_container::JsonContainer;
pub use selection::Selection;

/// Read/write cell passed to `Node::field`
#[derive(Debug, Default, Clone)]
pub struct ValueHandle {
    pub val: Option<Value>,
    /// Set when the engine synthesized the value from a schema default
    pub from_default: bool,
}

/// Request to select a child container or list node
#[derive(Clone)]
pub struct ChildRequest {
    pub sel: Selection,
    pub meta: DefId,
    /// Create the child if absent
    pub new: bool,
    /// Remove the child; the provider must return None
    pub delete: bool,
}

/// Request to advance through a list's items
#[derive(Clone)]
pub struct ListRequest {
    pub sel: Selection,
    pub meta: DefId,
    pub start_row: i64,
    pub row: i64,
    /// First request of an iteration; constraints may rewrite the rows
    pub first: bool,
    /// Key-scan when non-empty, row-scan otherwise
    pub key: Vec<Value>,
    pub new: bool,
    pub delete: bool,
}

impl ListRequest {
    pub fn set_start_row(&mut self, row: i64) {
        self.start_row = row;
        self.row = row;
    }

    pub fn increment_row(&mut self) {
        self.row += 1;
        self.first = false;
    }
}

/// Request to read or write one leaf
#[derive(Clone)]
pub struct FieldRequest {
    pub sel: Selection,
    pub meta: DefId,
    pub write: bool,
}

/// Request to invoke an rpc/action
#[derive(Clone)]
pub struct ActionRequest {
    pub sel: Selection,
    pub meta: DefId,
    pub input: Option<Selection>,
}

/// Edit lifecycle request delivered by `begin_edit`/`end_edit`/`delete`
#[derive(Clone)]
pub struct NodeRequest {
    pub sel: Selection,
    /// True only on the selection the edit started at
    pub edit_root: bool,
    /// True when the walk creates data, false for reads
    pub new: bool,
    /// True while deleting
    pub delete: bool,
}

/// One delivered notification event
#[derive(Debug, Clone)]
pub struct NotifyMessage {
    /// Rendered path of the subscribed notification
    pub path: String,
    /// Event payload in wire form
    pub event: Json,
}

/// Subscriber sink; invoked from the provider's delivery thread
pub type NotifyStream = std::sync::Arc<dyn Fn(NotifyMessage) + Send + Sync>;

/// Subscription handle returned by `notify`. Closing is idempotent and
/// may happen from any thread; dropping the handle closes it.
pub struct NotifyCloser {
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl NotifyCloser {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        NotifyCloser {
            closer: Some(Box::new(f)),
        }
    }

    pub fn close(&mut self) {
        if let Some(f) = self.closer.take() {
            f();
        }
    }
}

impl Drop for NotifyCloser {
    fn drop(&mut self) {
        self.close();
    }
}

/// Request to subscribe to a notification definition
#[derive(Clone)]
pub struct NotifyRequest {
    pub sel: Selection,
    pub meta: DefId,
    pub stream: NotifyStream,
}

impl NotifyRequest {
    /// Deliver one event through the stream. Safe to call from the
    /// provider's delivery thread.
    pub fn send(&self, event: Json) {
        let msg = NotifyMessage {
            path: self.sel.path().to_string(),
            event,
        };
        (self.stream)(msg);
    }
}

/// Provider-facing adapter binding a live data object to the schema
pub trait Node {
    /// Select the child container/list node named by `r.meta`.
    /// None means absent; `new` requests creation; `delete` requests
    /// removal and must answer None.
    fn child(&self, r: &ChildRequest) -> Result<Option<Rc<dyn Node>>> {
        if r.new {
            Err(TrellisError::Forbidden {
                reason: format!("node does not support creating {}", ident_of(&r.sel, r.meta)),
            })
        } else {
            Ok(None)
        }
    }

    /// Advance a list iteration. Key-scan when `r.key` is non-empty,
    /// row-scan otherwise; (None) terminates the iteration.
    fn next(&self, r: &ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> {
        if r.new {
            Err(TrellisError::Forbidden {
                reason: format!("node does not support creating {}", ident_of(&r.sel, r.meta)),
            })
        } else {
            Ok(None)
        }
    }

    /// Read or write one leaf. Reads tolerate unknown leaves by leaving
    /// the handle empty; writes to unsupported leaves error.
    fn field(&self, r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<()> {
        if r.write {
            Err(TrellisError::Forbidden {
                reason: format!("node does not support writing {}", ident_of(&r.sel, r.meta)),
            })
        } else {
            Ok(())
        }
    }

    /// Invoke an rpc, answering its output node if any
    fn action(&self, r: &ActionRequest) -> Result<Option<Rc<dyn Node>>> {
        Err(TrellisError::Forbidden {
            reason: format!("node does not implement {}", ident_of(&r.sel, r.meta)),
        })
    }

    /// Subscribe to a notification; the provider owns delivery
    fn notify(&self, r: &NotifyRequest) -> Result<NotifyCloser> {
        Err(TrellisError::Forbidden {
            reason: format!("node does not implement {}", ident_of(&r.sel, r.meta)),
        })
    }

    /// Identify the active case of a choice by inspecting the data.
    /// Pure inspection; the default probes each case's children.
    fn choose(&self, sel: &Selection, choice: DefId) -> Result<Option<DefId>> {
        default_choose(sel, choice)
    }

    /// Escape hatch exposing the provider's backing object
    fn peek(&self, _sel: &Selection) -> Option<Rc<dyn Any>> {
        None
    }

    fn begin_edit(&self, _r: &NodeRequest) -> Result<()> {
        Ok(())
    }

    fn end_edit(&self, _r: &NodeRequest) -> Result<()> {
        Ok(())
    }

    /// Remove the data behind this node, after the parent was asked via
    /// child/next with the delete flag
    fn delete(&self, _r: &NodeRequest) -> Result<()> {
        Ok(())
    }
}

fn ident_of(sel: &Selection, meta: DefId) -> String {
    sel.schema().ident(meta).to_string()
}

/// Default `choose`: the active case is the first whose data is present,
/// probing leaves by read and containers/lists by child selection.
pub fn default_choose(sel: &Selection, choice: DefId) -> Result<Option<DefId>> {
    let schema = std::rc::Rc::clone(sel.schema());
    for &case in schema.choice_cases(choice) {
        let members: Vec<DefId> = schema.iterate(case, true).collect();
        for member in members {
            if schema.is_leaf(member) {
                let mut hnd = ValueHandle::default();
                let r = FieldRequest {
                    sel: sel.clone(),
                    meta: member,
                    write: false,
                };
                sel.node().field(&r, &mut hnd)?;
                if hnd.val.is_some() {
                    return Ok(Some(case));
                }
            } else if schema.has_children(member) || schema.is_list(member) {
                let r = ChildRequest {
                    sel: sel.clone(),
                    meta: member,
                    new: false,
                    delete: false,
                };
                if sel.node().child(&r)?.is_some() {
                    return Ok(Some(case));
                }
            }
        }
    }
    Ok(None)
}
