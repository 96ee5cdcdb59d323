//! Traversal constraints
//!
//! A constraint is a set of pre/post hooks applied while walking or
//! editing: field, container, list, and action visits each get a pre and
//! a post check. Hooks answer `Ok(true)` to proceed, `Ok(false)` to
//! prune silently, or an error to abort the walk.
//!
//! A `ConstraintSet` is ordered by (priority, weight, insertion) and is
//! extended copy-on-write when query parameters install additional
//! constraints on a sub-selection.

pub mod content;
pub mod fields;
pub mod limits;
pub mod range;
pub mod with_defaults;

use std::rc::Rc;

use crate::errors::Result;
use crate::node::{ActionRequest, ChildRequest, FieldRequest, ListRequest, Selection, ValueHandle};
use crate::path::Path;
use trellis_core_types::schema::EVENT_PRUNED;

pub use content::{Content, ContentConstraint};
pub use fields::{ExcludeFieldsMatcher, FieldsMatcher};
pub use limits::{MaxDepth, MaxNode};
pub use range::ListRange;
pub use with_defaults::{WithDefaults, WithDefaultsMode};

/// Pre/post hooks for traversal steps; all default to proceed
pub trait Constraint {
    fn check_container_pre(&self, _r: &ChildRequest) -> Result<bool> {
        Ok(true)
    }
    fn check_container_post(&self, _r: &ChildRequest, _child: Option<&Selection>) -> Result<bool> {
        Ok(true)
    }
    fn check_list_pre(&self, _r: &mut ListRequest) -> Result<bool> {
        Ok(true)
    }
    fn check_list_post(&self, _r: &ListRequest, _child: Option<&Selection>) -> Result<bool> {
        Ok(true)
    }
    fn check_field_pre(&self, _r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        Ok(true)
    }
    fn check_field_post(&self, _r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        Ok(true)
    }
    fn check_action_pre(&self, _r: &ActionRequest) -> Result<bool> {
        Ok(true)
    }
    fn check_action_post(&self, _r: &ActionRequest) -> Result<bool> {
        Ok(true)
    }
}

struct Entry {
    name: String,
    priority: i32,
    weight: i32,
    seq: usize,
    constraint: Rc<dyn Constraint>,
}

/// Ordered, composable set of constraints
#[derive(Default)]
pub struct ConstraintSet {
    entries: Vec<Entry>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        ConstraintSet::default()
    }

    /// Copy of `parent` that further `add` calls extend
    pub fn extend_from(parent: &ConstraintSet) -> Self {
        ConstraintSet {
            entries: parent
                .entries
                .iter()
                .map(|e| Entry {
                    name: e.name.clone(),
                    priority: e.priority,
                    weight: e.weight,
                    seq: e.seq,
                    constraint: Rc::clone(&e.constraint),
                })
                .collect(),
        }
    }

    /// Install a constraint; a same-named constraint is replaced
    pub fn add(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        weight: i32,
        constraint: Rc<dyn Constraint>,
    ) {
        let name = name.into();
        self.entries.retain(|e| e.name != name);
        let seq = self.entries.len();
        self.entries.push(Entry {
            name,
            priority,
            weight,
            seq,
            constraint,
        });
        self.entries
            .sort_by_key(|e| (e.priority, e.weight, e.seq));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn check_container_pre(&self, r: &ChildRequest) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_container_pre(r)? {
                crate::log_engine_event!(
                    EVENT_PRUNED,
                    r.sel.path(),
                    constraint = e.name.as_str(),
                    ident = r.sel.schema().ident(r.meta),
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_container_post(&self, r: &ChildRequest, child: Option<&Selection>) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_container_post(r, child)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_list_pre(&self, r: &mut ListRequest) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_list_pre(r)? {
                crate::log_engine_event!(
                    EVENT_PRUNED,
                    r.sel.path(),
                    constraint = e.name.as_str(),
                    ident = r.sel.schema().ident(r.meta),
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_list_post(&self, r: &ListRequest, child: Option<&Selection>) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_list_post(r, child)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_field_pre(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_field_pre(r, hnd)? {
                crate::log_engine_event!(
                    EVENT_PRUNED,
                    r.sel.path(),
                    constraint = e.name.as_str(),
                    ident = r.sel.schema().ident(r.meta),
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_field_post(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_field_post(r, hnd)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_action_pre(&self, r: &ActionRequest) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_action_pre(r)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn check_action_post(&self, r: &ActionRequest) -> Result<bool> {
        for e in &self.entries {
            if !e.constraint.check_action_post(r)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Installed constraint names, for diagnostics
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}

/// Idents of the path segments below a base depth; constraints match
/// against this relative form.
pub(crate) fn rel_idents(path: &Rc<Path>, base_len: usize) -> Vec<String> {
    path.segments()
        .into_iter()
        .skip(base_len)
        .map(|p| p.ident().to_string())
        .collect()
}

/// Install constraints for recognized query parameters.
///
/// | key | constraint |
/// |---|---|
/// | `depth` | MaxDepth |
/// | `fields` | FieldsMatcher |
/// | `c2-xfields` | ExcludeFieldsMatcher |
/// | `c2-range` | ListRange |
/// | `c2-max-node-count` | MaxNode |
/// | `content` | ContentConstraint |
/// | `with-defaults` | WithDefaults |
pub fn install_params(
    set: &mut ConstraintSet,
    params: &[(String, String)],
    base: &Rc<Path>,
) -> Result<()> {
    let base_len = base.len();
    let find = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let mut max_depth = MaxDepth::new(base_len, 32);
    if let Some(v) = find("depth") {
        if let Ok(n) = v.parse::<usize>() {
            max_depth = MaxDepth::new(base_len, n);
        }
    }
    set.add("depth", 10, 50, Rc::new(max_depth));

    if let Some(v) = find("c2-range") {
        set.add("c2-range", 20, 50, Rc::new(ListRange::parse(base_len, v)?));
    }
    if let Some(v) = find("fields") {
        set.add("fields", 10, 50, Rc::new(FieldsMatcher::parse(base_len, v)?));
    }
    if let Some(v) = find("c2-xfields") {
        set.add(
            "c2-xfields",
            10,
            50,
            Rc::new(ExcludeFieldsMatcher::parse(base_len, v)?),
        );
    }

    let mut max_node = MaxNode::new(10000);
    if let Some(v) = find("c2-max-node-count") {
        if let Ok(n) = v.parse::<usize>() {
            max_node = MaxNode::new(n);
        }
    }
    set.add("c2-max-node-count", 10, 60, Rc::new(max_node));

    if let Some(v) = find("content") {
        set.add("content", 10, 70, Rc::new(ContentConstraint::parse(v)?));
    }
    if let Some(v) = find("with-defaults") {
        set.add("with-defaults", 50, 70, Rc::new(WithDefaults::parse(v)?));
    }
    Ok(())
}
