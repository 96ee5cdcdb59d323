//! Browser: the root binding of a schema to a data node
//!
//! A `Browser` exclusively references one root schema position and one
//! root node, and owns the trigger table observing edit cycles. All
//! traversal starts at `root()`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::Result;
use crate::meta::{DefId, Schema};
use crate::node::{Node, NodeRequest, Selection};
use crate::path::Path;
use trellis_core_types::RequestContext;

/// Observer of edit begin/end cycles, keyed by path prefix.
/// An empty target observes every edit.
pub struct Trigger {
    pub target: String,
    pub on_begin: Option<Box<dyn Fn(&NodeRequest) -> Result<()>>>,
    pub on_end: Option<Box<dyn Fn(&NodeRequest) -> Result<()>>>,
}

impl Trigger {
    pub fn on_begin(target: impl Into<String>, f: impl Fn(&NodeRequest) -> Result<()> + 'static) -> Trigger {
        Trigger {
            target: target.into(),
            on_begin: Some(Box::new(f)),
            on_end: None,
        }
    }

    pub fn on_end(target: impl Into<String>, f: impl Fn(&NodeRequest) -> Result<()> + 'static) -> Trigger {
        Trigger {
            target: target.into(),
            on_begin: None,
            on_end: Some(Box::new(f)),
        }
    }

    fn matches(&self, path: &str) -> bool {
        self.target.is_empty() || path.starts_with(&self.target)
    }
}

#[derive(Default)]
struct TriggerTable {
    next_id: usize,
    entries: Vec<(usize, Rc<Trigger>)>,
}

/// Root binding of a schema position to a provider node
pub struct Browser {
    schema: Rc<Schema>,
    meta: DefId,
    node: Rc<dyn Node>,
    triggers: RefCell<TriggerTable>,
}

impl Browser {
    /// Bind a module's root to a provider node
    pub fn new(schema: Rc<Schema>, node: Rc<dyn Node>) -> Rc<Browser> {
        let meta = schema.root();
        Browser::new_at(schema, meta, node)
    }

    /// Bind a sub-position; used by `Selection::split`
    pub(crate) fn new_at(schema: Rc<Schema>, meta: DefId, node: Rc<dyn Node>) -> Rc<Browser> {
        Rc::new(Browser {
            schema,
            meta,
            node,
            triggers: RefCell::new(TriggerTable::default()),
        })
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn node(&self) -> &Rc<dyn Node> {
        &self.node
    }

    /// Selection at the root of this browser
    pub fn root(self: &Rc<Self>) -> Selection {
        self.root_with_context(RequestContext::background())
    }

    /// Root selection carrying an explicit request context
    pub fn root_with_context(self: &Rc<Self>, context: RequestContext) -> Selection {
        let path = Path::root_at(Rc::clone(&self.schema), self.meta);
        Selection::new_root(Rc::clone(self), Rc::clone(&self.node), path, context)
    }

    /// Register an edit observer; the returned id unregisters it
    pub fn register_trigger(&self, trigger: Trigger) -> usize {
        let mut table = self.triggers.borrow_mut();
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, Rc::new(trigger)));
        id
    }

    pub fn unregister_trigger(&self, id: usize) {
        self.triggers.borrow_mut().entries.retain(|(i, _)| *i != id);
    }

    pub(crate) fn trigger_begin(&self, r: &NodeRequest) -> Result<()> {
        for t in self.matching(r) {
            if let Some(f) = &t.on_begin {
                f(r)?;
            }
        }
        Ok(())
    }

    pub(crate) fn trigger_end(&self, r: &NodeRequest) -> Result<()> {
        for t in self.matching(r) {
            if let Some(f) = &t.on_end {
                f(r)?;
            }
        }
        Ok(())
    }

    /// Matching triggers, collected before invocation so callbacks may
    /// register or unregister triggers themselves
    fn matching(&self, r: &NodeRequest) -> Vec<Rc<Trigger>> {
        let path = r.sel.path().to_string();
        self.triggers
            .borrow()
            .entries
            .iter()
            .filter(|(_, t)| t.matches(&path))
            .map(|(_, t)| Rc::clone(t))
            .collect()
    }
}
