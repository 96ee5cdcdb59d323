//! Closure-composed nodes
//!
//! `BasicNode` lets providers assemble a `Node` from per-operation
//! closures instead of implementing the trait, so nodes compose without
//! inheritance. Unset operations keep the contract's defaults: reads
//! answer absent, writes refuse.

use std::any::Any;
use std::rc::Rc;

use crate::errors::{Result, TrellisError};
use crate::meta::DefId;
use crate::node::{
    default_choose, ActionRequest, ChildRequest, FieldRequest, ListRequest, Node, NodeRequest,
    NotifyCloser, NotifyRequest, Selection, ValueHandle,
};
use trellis_core_types::Value;

type ChildFn = Box<dyn Fn(&ChildRequest) -> Result<Option<Rc<dyn Node>>>>;
type NextFn = Box<dyn Fn(&ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>>>;
type FieldFn = Box<dyn Fn(&FieldRequest, &mut ValueHandle) -> Result<()>>;
type ActionFn = Box<dyn Fn(&ActionRequest) -> Result<Option<Rc<dyn Node>>>>;
type NotifyFn = Box<dyn Fn(&NotifyRequest) -> Result<NotifyCloser>>;
type ChooseFn = Box<dyn Fn(&Selection, DefId) -> Result<Option<DefId>>>;
type EditFn = Box<dyn Fn(&NodeRequest) -> Result<()>>;

/// A `Node` assembled from per-operation closures
#[derive(Default)]
pub struct BasicNode {
    on_child: Option<ChildFn>,
    on_next: Option<NextFn>,
    on_field: Option<FieldFn>,
    on_action: Option<ActionFn>,
    on_notify: Option<NotifyFn>,
    on_choose: Option<ChooseFn>,
    on_begin_edit: Option<EditFn>,
    on_end_edit: Option<EditFn>,
    on_delete: Option<EditFn>,
    peekable: Option<Rc<dyn Any>>,
}

impl BasicNode {
    pub fn new() -> Self {
        BasicNode::default()
    }

    pub fn on_child(
        mut self,
        f: impl Fn(&ChildRequest) -> Result<Option<Rc<dyn Node>>> + 'static,
    ) -> Self {
        self.on_child = Some(Box::new(f));
        self
    }

    pub fn on_next(
        mut self,
        f: impl Fn(&ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> + 'static,
    ) -> Self {
        self.on_next = Some(Box::new(f));
        self
    }

    pub fn on_field(
        mut self,
        f: impl Fn(&FieldRequest, &mut ValueHandle) -> Result<()> + 'static,
    ) -> Self {
        self.on_field = Some(Box::new(f));
        self
    }

    pub fn on_action(
        mut self,
        f: impl Fn(&ActionRequest) -> Result<Option<Rc<dyn Node>>> + 'static,
    ) -> Self {
        self.on_action = Some(Box::new(f));
        self
    }

    pub fn on_notify(
        mut self,
        f: impl Fn(&NotifyRequest) -> Result<NotifyCloser> + 'static,
    ) -> Self {
        self.on_notify = Some(Box::new(f));
        self
    }

    pub fn on_choose(
        mut self,
        f: impl Fn(&Selection, DefId) -> Result<Option<DefId>> + 'static,
    ) -> Self {
        self.on_choose = Some(Box::new(f));
        self
    }

    pub fn on_begin_edit(mut self, f: impl Fn(&NodeRequest) -> Result<()> + 'static) -> Self {
        self.on_begin_edit = Some(Box::new(f));
        self
    }

    pub fn on_end_edit(mut self, f: impl Fn(&NodeRequest) -> Result<()> + 'static) -> Self {
        self.on_end_edit = Some(Box::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl Fn(&NodeRequest) -> Result<()> + 'static) -> Self {
        self.on_delete = Some(Box::new(f));
        self
    }

    pub fn peekable(mut self, backing: Rc<dyn Any>) -> Self {
        self.peekable = Some(backing);
        self
    }

    pub fn into_node(self) -> Rc<dyn Node> {
        Rc::new(self)
    }
}

impl Node for BasicNode {
    fn child(&self, r: &ChildRequest) -> Result<Option<Rc<dyn Node>>> {
        match &self.on_child {
            Some(f) => f(r),
            None if r.new => Err(TrellisError::Forbidden {
                reason: format!(
                    "node does not support creating {}",
                    r.sel.schema().ident(r.meta)
                ),
            }),
            None => Ok(None),
        }
    }

    fn next(&self, r: &ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> {
        match &self.on_next {
            Some(f) => f(r),
            None if r.new => Err(TrellisError::Forbidden {
                reason: format!(
                    "node does not support creating {}",
                    r.sel.schema().ident(r.meta)
                ),
            }),
            None => Ok(None),
        }
    }

    fn field(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<()> {
        match &self.on_field {
            Some(f) => f(r, hnd),
            None if r.write => Err(TrellisError::Forbidden {
                reason: format!(
                    "node does not support writing {}",
                    r.sel.schema().ident(r.meta)
                ),
            }),
            None => Ok(()),
        }
    }

    fn action(&self, r: &ActionRequest) -> Result<Option<Rc<dyn Node>>> {
        match &self.on_action {
            Some(f) => f(r),
            None => Err(TrellisError::Forbidden {
                reason: format!(
                    "node does not implement {}",
                    r.sel.schema().ident(r.meta)
                ),
            }),
        }
    }

    fn notify(&self, r: &NotifyRequest) -> Result<NotifyCloser> {
        match &self.on_notify {
            Some(f) => f(r),
            None => Err(TrellisError::Forbidden {
                reason: format!(
                    "node does not implement {}",
                    r.sel.schema().ident(r.meta)
                ),
            }),
        }
    }

    fn choose(&self, sel: &Selection, choice: DefId) -> Result<Option<DefId>> {
        match &self.on_choose {
            Some(f) => f(sel, choice),
            None => default_choose(sel, choice),
        }
    }

    fn peek(&self, _sel: &Selection) -> Option<Rc<dyn Any>> {
        self.peekable.as_ref().map(Rc::clone)
    }

    fn begin_edit(&self, r: &NodeRequest) -> Result<()> {
        match &self.on_begin_edit {
            Some(f) => f(r),
            None => Ok(()),
        }
    }

    fn end_edit(&self, r: &NodeRequest) -> Result<()> {
        match &self.on_end_edit {
            Some(f) => f(r),
            None => Ok(()),
        }
    }

    fn delete(&self, r: &NodeRequest) -> Result<()> {
        match &self.on_delete {
            Some(f) => f(r),
            None => Ok(()),
        }
    }
}
