//! Selections
//!
//! A `Selection` is the cursor at the center of the engine: one `Node`
//! pinned to one schema position, with the path that got there, the
//! constraints in force, and a pointer to the parent selection forming
//! the call stack. Selections are value-typed and cheap to clone;
//! mutation flows through the node's callbacks.
//!
//! Errors are sticky: once `last_err` is set, every subsequent fluent
//! method is a no-op returning the same selection, so chains
//! short-circuit without exception control flow.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::constraints::{install_params, ConstraintSet};
use crate::errors::{Result, TrellisError};
use crate::meta::{DefId, Schema};
use crate::node::edit::{self, Strategy};
use crate::node::{
    ActionRequest, Browser, ChildRequest, FieldRequest, ListRequest, Node, NodeRequest,
    NotifyCloser, NotifyRequest, NotifyStream, ValueHandle,
};
use crate::path::{parse_query, parse_url_path, split_query, Path, PathSlice};
use trellis_core_types::schema::{EVENT_BEGIN_EDIT, EVENT_END_EDIT, EVENT_NOTIFY};
use trellis_core_types::{RequestContext, Value};

/// A link between a data node and a schema definition
#[derive(Clone)]
pub struct Selection {
    browser: Rc<Browser>,
    parent: Option<Rc<Selection>>,
    node: Rc<dyn Node>,
    path: Rc<Path>,
    /// True when this selection is a list node, false for an item of it
    inside_list: bool,
    constraints: Rc<ConstraintSet>,
    context: RequestContext,
    last_err: Option<TrellisError>,
}

impl Selection {
    pub(crate) fn new_root(
        browser: Rc<Browser>,
        node: Rc<dyn Node>,
        path: Rc<Path>,
        context: RequestContext,
    ) -> Selection {
        Selection {
            browser,
            parent: None,
            node,
            path,
            inside_list: false,
            constraints: Rc::new(ConstraintSet::new()),
            context,
            last_err: None,
        }
    }

    // ===== accessors =====

    pub fn browser(&self) -> &Rc<Browser> {
        &self.browser
    }

    pub fn node(&self) -> &Rc<dyn Node> {
        &self.node
    }

    pub fn path(&self) -> &Rc<Path> {
        &self.path
    }

    pub fn meta(&self) -> DefId {
        self.path.meta()
    }

    pub fn schema(&self) -> &Rc<Schema> {
        self.path.schema()
    }

    /// Key of this list item, empty otherwise
    pub fn key(&self) -> &[Value] {
        self.path.key()
    }

    pub fn parent(&self) -> Option<&Rc<Selection>> {
        self.parent.as_ref()
    }

    pub fn inside_list(&self) -> bool {
        self.inside_list
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn last_err(&self) -> Option<&TrellisError> {
        self.last_err.as_ref()
    }

    /// Consume the fluent chain into a Result
    pub fn or_err(self) -> Result<Selection> {
        match self.last_err {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }

    /// Escape hatch to the provider's backing object
    pub fn peek(&self) -> Option<Rc<dyn Any>> {
        self.node.peek(self)
    }

    fn sticky(&self) -> Result<()> {
        if let Some(e) = &self.last_err {
            return Err(e.clone());
        }
        if self.context.is_cancelled() {
            return Err(TrellisError::Cancelled);
        }
        Ok(())
    }

    fn fail(&self, err: TrellisError) -> Selection {
        crate::log_engine_error!(err, self.path);
        let mut s = self.clone();
        s.last_err = Some(err);
        s
    }

    /// Unclassified provider errors get the current path appended
    fn annotate(&self, err: TrellisError) -> TrellisError {
        match err {
            TrellisError::Internal { message } => {
                TrellisError::provider(message, self.path.to_string())
            }
            other => other,
        }
    }

    // ===== traversal =====

    /// Select the child container or list node for `meta`, applying
    /// container pre/post constraints. `Ok(None)` means absent or
    /// pruned.
    pub fn select(&self, meta: DefId, new: bool) -> Result<Option<Selection>> {
        self.sticky()?;
        self.select_with(meta, new, false)
    }

    pub(crate) fn select_with(
        &self,
        meta: DefId,
        new: bool,
        delete: bool,
    ) -> Result<Option<Selection>> {
        let r = ChildRequest {
            sel: self.clone(),
            meta,
            new,
            delete,
        };
        if !self.constraints.check_container_pre(&r)? {
            return Ok(None);
        }
        let child_node = self.node.child(&r).map_err(|e| self.annotate(e))?;
        let child = child_node.map(|n| Selection {
            browser: Rc::clone(&self.browser),
            parent: Some(Rc::new(self.clone())),
            node: n,
            path: self.path.child(meta),
            inside_list: false,
            constraints: Rc::clone(&self.constraints),
            context: self.context.clone(),
            last_err: None,
        });
        if !self.constraints.check_container_post(&r, child.as_ref())? {
            return Ok(None);
        }
        Ok(child)
    }

    /// A fresh iteration request for this list selection
    pub fn list_request(&self) -> ListRequest {
        ListRequest {
            sel: self.clone(),
            meta: self.meta(),
            start_row: 0,
            row: 0,
            first: true,
            key: Vec::new(),
            new: false,
            delete: false,
        }
    }

    /// Advance a list iteration, applying list pre/post constraints
    /// (which may rewrite the requested rows). Self must be the list
    /// node selection. `Ok(None)` terminates the iteration.
    pub fn select_list_item(&self, r: &mut ListRequest) -> Result<Option<(Selection, Vec<Value>)>> {
        self.sticky()?;
        if !self.constraints.check_list_pre(r)? {
            return Ok(None);
        }
        let found = self.node.next(r).map_err(|e| self.annotate(e))?;
        let child = found.map(|(n, key)| {
            // item paths parent on the list's parent, not the list node
            let parent_path = self
                .path
                .parent()
                .cloned()
                .unwrap_or_else(|| Rc::clone(&self.path));
            let sel = Selection {
                browser: Rc::clone(&self.browser),
                parent: Some(Rc::new(self.clone())),
                node: n,
                path: Path::list_item(&parent_path, r.meta, key.clone()),
                inside_list: true,
                constraints: Rc::clone(&self.constraints),
                context: self.context.clone(),
                last_err: None,
            };
            (sel, key)
        });
        if !self
            .constraints
            .check_list_post(r, child.as_ref().map(|(s, _)| s))?
        {
            return Ok(None);
        }
        Ok(child)
    }

    /// Navigate to another selection. Any number of leading `../` pop up
    /// the parent chain; the rest is a URL path with optional query
    /// parameters that install constraints on the result.
    pub fn find(&self, path: &str) -> Selection {
        if self.last_err.is_some() {
            return self.clone();
        }
        let mut s = self.clone();
        let mut p = path;
        while let Some(rest) = p.strip_prefix("../") {
            let Some(parent) = s.parent.clone() else {
                return self.fail(TrellisError::NoParent {
                    path: path.to_string(),
                });
            };
            s = (*parent).clone();
            p = rest;
        }
        s.find_url(p)
    }

    /// Like `find` without `../` support; query parameters add
    /// constraints to the returned selection, the original selection is
    /// unaltered.
    pub fn find_url(&self, url: &str) -> Selection {
        if self.last_err.is_some() {
            return self.clone();
        }
        let (path_part, query) = split_query(url);
        let mut s = self.clone();
        if let Some(q) = query {
            match Self::constraints_from(&s, q) {
                Ok(set) => s.constraints = Rc::new(set),
                Err(e) => return self.fail(e),
            }
        }
        let slice = match parse_url_path(&s.path, path_part) {
            Ok(slice) => slice,
            Err(e) => return self.fail(e),
        };
        s.find_slice(&slice)
    }

    /// Apply constraints in query-parameter form to a copy of this
    /// selection; the original remains unaltered.
    pub fn constrain(&self, params: &str) -> Selection {
        if self.last_err.is_some() {
            return self.clone();
        }
        match Self::constraints_from(self, params) {
            Ok(set) => {
                let mut s = self.clone();
                s.constraints = Rc::new(set);
                s
            }
            Err(e) => self.fail(e),
        }
    }

    fn constraints_from(sel: &Selection, query: &str) -> Result<ConstraintSet> {
        let params = parse_query(query)?;
        let mut set = ConstraintSet::extend_from(&sel.constraints);
        install_params(&mut set, &params, &sel.path)?;
        Ok(set)
    }

    /// Walk a parsed slice, selecting containers and keyed list items
    pub fn find_slice(&self, slice: &PathSlice) -> Selection {
        let mut at = self.clone();
        for seg in slice.segments() {
            let meta = seg.meta();
            if seg.key().is_empty() {
                match at.select(meta, false) {
                    Ok(Some(child)) => at = child,
                    Ok(None) => {
                        return at.fail(TrellisError::ItemNotFound {
                            path: seg.to_string(),
                        })
                    }
                    Err(e) => return at.fail(e),
                }
            } else {
                let list = match at.select(meta, false) {
                    Ok(Some(list)) => list,
                    Ok(None) => {
                        return at.fail(TrellisError::ItemNotFound {
                            path: seg.to_string(),
                        })
                    }
                    Err(e) => return at.fail(e),
                };
                let mut lr = list.list_request();
                lr.key = seg.key().to_vec();
                match list.select_list_item(&mut lr) {
                    Ok(Some((item, _))) => at = item,
                    Ok(None) => {
                        return at.fail(TrellisError::ItemNotFound {
                            path: seg.to_string(),
                        })
                    }
                    Err(e) => return at.fail(e),
                }
            }
        }
        at
    }

    // ===== leaf access =====

    /// Read one leaf, with constraint and default application
    pub fn get(&self, ident: &str) -> Result<Option<Value>> {
        self.sticky()?;
        let meta = self.schema().require_ident(self.meta(), ident)?;
        if !self.schema().is_leaf(meta) {
            return Err(TrellisError::NotLeaf {
                ident: ident.to_string(),
            });
        }
        let mut r = FieldRequest {
            sel: self.clone(),
            meta,
            write: false,
        };
        let mut hnd = ValueHandle::default();
        self.get_value_hnd(&mut r, &mut hnd, true)?;
        Ok(hnd.val)
    }

    /// Write one leaf from raw wire-shaped input
    pub fn set(&self, ident: &str, raw: &Json) -> Result<()> {
        self.sticky()?;
        let meta = self.schema().require_ident(self.meta(), ident)?;
        let typ = self
            .schema()
            .leaf_type(meta)
            .ok_or_else(|| TrellisError::NotLeaf {
                ident: ident.to_string(),
            })?;
        let v = Value::coerce(typ, raw)?;
        self.set_value(meta, v)
    }

    pub(crate) fn get_value_hnd(
        &self,
        r: &mut FieldRequest,
        hnd: &mut ValueHandle,
        use_default: bool,
    ) -> Result<()> {
        if !self.constraints.check_field_pre(r, hnd)? {
            return Ok(());
        }
        self.node.field(r, hnd).map_err(|e| self.annotate(e))?;
        if hnd.val.is_none() && use_default {
            if let (Some(typ), Some(default)) = (
                self.schema().leaf_type(r.meta),
                self.schema().default_for(r.meta),
            ) {
                hnd.val = Some(Value::from_str_form(typ, default)?);
                hnd.from_default = true;
            }
        }
        if !self.constraints.check_field_post(r, hnd)? {
            hnd.val = None;
        }
        Ok(())
    }

    pub(crate) fn set_value(&self, meta: DefId, v: Value) -> Result<()> {
        let r = FieldRequest {
            sel: self.clone(),
            meta,
            write: true,
        };
        let mut hnd = ValueHandle {
            val: Some(v),
            from_default: false,
        };
        if !self.constraints.check_field_pre(&r, &mut hnd)? {
            return Ok(());
        }
        self.node.field(&r, &mut hnd).map_err(|e| self.annotate(e))?;
        let mut post_hnd = hnd;
        if !self.constraints.check_field_post(&r, &mut post_hnd)? {
            return Ok(());
        }
        Ok(())
    }

    // ===== edits =====

    /// Copy current node into the given node; existing destination
    /// containers or list items are conflicts.
    pub fn insert_into(&self, to: Rc<dyn Node>) -> Selection {
        self.edit_into(to, Strategy::Insert)
    }

    /// Copy the given node into current node; existing destination
    /// containers or list items are conflicts.
    pub fn insert_from(&self, from: Rc<dyn Node>) -> Selection {
        self.edit_from(from, Strategy::Insert)
    }

    /// Merge current node into the given node, creating or updating
    pub fn upsert_into(&self, to: Rc<dyn Node>) -> Selection {
        self.edit_into(to, Strategy::Upsert)
    }

    /// Merge the given node into current node, creating or updating
    pub fn upsert_from(&self, from: Rc<dyn Node>) -> Selection {
        self.edit_from(from, Strategy::Upsert)
    }

    /// Copy current node into the given node; destinations must exist
    pub fn update_into(&self, to: Rc<dyn Node>) -> Selection {
        self.edit_into(to, Strategy::Update)
    }

    /// Copy the given node into current node; destinations must exist
    pub fn update_from(&self, from: Rc<dyn Node>) -> Selection {
        self.edit_from(from, Strategy::Update)
    }

    fn edit_into(&self, to: Rc<dyn Node>, strategy: Strategy) -> Selection {
        if self.last_err.is_some() {
            return self.clone();
        }
        let to_sel = self.split(to);
        match edit::edit(self, &to_sel, strategy) {
            Ok(()) => self.clone(),
            Err(e) => self.fail(e),
        }
    }

    fn edit_from(&self, from: Rc<dyn Node>, strategy: Strategy) -> Selection {
        if self.last_err.is_some() {
            return self.clone();
        }
        let from_sel = self.split(from);
        match edit::edit(&from_sel, self, strategy) {
            Ok(()) => self.clone(),
            Err(e) => self.fail(e),
        }
    }

    /// A new independent selection at this schema position over a whole
    /// different data node, with its own browser and no constraints.
    pub fn split(&self, node: Rc<dyn Node>) -> Selection {
        let browser = Browser::new_at(
            Rc::clone(self.schema()),
            self.meta(),
            Rc::clone(&node),
        );
        Selection {
            browser,
            parent: None,
            node,
            path: Rc::clone(&self.path),
            inside_list: self.inside_list,
            constraints: Rc::new(ConstraintSet::new()),
            context: self.context.clone(),
            last_err: None,
        }
    }

    /// Remove the data at this position, bubbling edit events to root
    pub fn delete(&self) -> Result<()> {
        self.sticky()?;
        let nr = NodeRequest {
            sel: self.clone(),
            edit_root: true,
            new: false,
            delete: true,
        };
        self.node.delete(&nr).map_err(|e| self.annotate(e))?;
        self.begin_edit(false, true)?;

        let parent = self
            .parent
            .as_ref()
            .ok_or_else(|| TrellisError::Internal {
                message: "cannot delete root selection".to_string(),
            })?;
        if self.inside_list {
            let mut lr = parent.list_request();
            lr.key = self.key().to_vec();
            lr.delete = true;
            parent
                .node
                .next(&lr)
                .map_err(|e| self.annotate(e))?;
        } else {
            let cr = ChildRequest {
                sel: (**parent).clone(),
                meta: self.meta(),
                new: false,
                delete: true,
            };
            parent
                .node
                .child(&cr)
                .map_err(|e| self.annotate(e))?;
        }

        self.end_edit(false, true)?;
        Ok(())
    }

    // ===== rpc and notifications =====

    /// Invoke the rpc at this selection, answering its output selection
    pub fn action(&self, input: Option<Rc<dyn Node>>) -> Result<Option<Selection>> {
        self.sticky()?;
        let rpc = self
            .schema()
            .rpc(self.meta())
            .cloned()
            .ok_or_else(|| TrellisError::Internal {
                message: format!("{} is not an rpc", self.path.ident()),
            })?;

        let input_sel = match (input, rpc.input) {
            (Some(n), Some(input_meta)) => Some(Selection {
                browser: Rc::clone(&self.browser),
                parent: Some(Rc::new(self.clone())),
                node: n,
                path: self.path.child(input_meta),
                inside_list: false,
                constraints: Rc::clone(&self.constraints),
                context: self.context.clone(),
                last_err: None,
            }),
            _ => None,
        };

        let r = ActionRequest {
            sel: self.clone(),
            meta: self.meta(),
            input: input_sel,
        };
        if !self.constraints.check_action_pre(&r)? {
            return Ok(None);
        }
        let out = self.node.action(&r).map_err(|e| self.annotate(e))?;
        let out_sel = match (out, rpc.output) {
            (Some(n), Some(output_meta)) => Some(Selection {
                browser: Rc::clone(&self.browser),
                parent: Some(Rc::new(self.clone())),
                node: n,
                path: self.path.child(output_meta),
                inside_list: false,
                constraints: Rc::clone(&self.constraints),
                context: self.context.clone(),
                last_err: None,
            }),
            _ => None,
        };
        if !self.constraints.check_action_post(&r)? {
            return Ok(None);
        }
        Ok(out_sel)
    }

    /// Subscribe to the notification at this selection. The provider
    /// owns delivery; the returned closer is idempotent.
    pub fn notifications(&self, stream: NotifyStream) -> Result<NotifyCloser> {
        self.sticky()?;
        let r = NotifyRequest {
            sel: self.clone(),
            meta: self.meta(),
            stream,
        };
        let closer = self.node.notify(&r).map_err(|e| self.annotate(e))?;
        crate::log_engine_event!(EVENT_NOTIFY, self.path);
        Ok(closer)
    }

    // ===== edit events =====

    /// Fire `begin_edit` on this node and, when `bubble`, every ancestor
    /// up to the root; triggers observe the cycle once.
    pub(crate) fn begin_edit(&self, new: bool, bubble: bool) -> Result<()> {
        crate::log_engine_event!(
            EVENT_BEGIN_EDIT,
            self.path,
            request_id = %self.context.request_id,
        );
        let mut at = self.clone();
        let mut edit_root = true;
        let mut triggered = false;
        loop {
            let r = NodeRequest {
                sel: at.clone(),
                edit_root,
                new,
                delete: false,
            };
            at.node.begin_edit(&r).map_err(|e| at.annotate(e))?;
            if !triggered {
                self.browser.trigger_begin(&r)?;
                triggered = true;
            }
            let Some(parent) = at.parent.clone() else {
                break;
            };
            if !bubble {
                break;
            }
            at = (*parent).clone();
            edit_root = false;
        }
        Ok(())
    }

    /// Fire `end_edit` symmetrically to `begin_edit`
    pub(crate) fn end_edit(&self, new: bool, bubble: bool) -> Result<()> {
        crate::log_engine_event!(
            EVENT_END_EDIT,
            self.path,
            request_id = %self.context.request_id,
        );
        let mut at = self.clone();
        let mut edit_root = true;
        let mut triggered = false;
        loop {
            let r = NodeRequest {
                sel: at.clone(),
                edit_root,
                new,
                delete: false,
            };
            at.node.end_edit(&r).map_err(|e| at.annotate(e))?;
            if !triggered {
                self.browser.trigger_end(&r)?;
                triggered = true;
            }
            let Some(parent) = at.parent.clone() else {
                break;
            };
            if !bubble {
                break;
            }
            at = (*parent).clone();
            edit_root = false;
        }
        Ok(())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("path", &self.path)
            .field("inside_list", &self.inside_list)
            .field("last_err", &self.last_err)
            .finish()
    }
}
