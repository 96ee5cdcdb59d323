//! Depth and node-count budgets

use std::cell::Cell;

use crate::constraints::Constraint;
use crate::errors::{Result, TrellisError};
use crate::node::{ChildRequest, FieldRequest, ListRequest, Selection, ValueHandle};

/// Denies descent past a maximum depth below the constrained selection.
/// Pruning is silent, matching a partial-content read.
pub struct MaxDepth {
    base: usize,
    max: usize,
}

impl MaxDepth {
    pub fn new(base: usize, max: usize) -> Self {
        MaxDepth { base, max }
    }

    fn child_depth(&self, parent_len: usize) -> usize {
        (parent_len + 1).saturating_sub(self.base)
    }
}

impl Constraint for MaxDepth {
    fn check_container_pre(&self, r: &ChildRequest) -> Result<bool> {
        // the last allowed level keeps its leaves but not its containers
        Ok(self.child_depth(r.sel.path().len()) < self.max)
    }

    fn check_list_pre(&self, r: &mut ListRequest) -> Result<bool> {
        Ok(self.child_depth(r.sel.path().len()) <= self.max)
    }

    fn check_field_pre(&self, r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        Ok(self.child_depth(r.sel.path().len()) <= self.max)
    }
}

/// Running node budget across one walk; exceeding it aborts with a
/// TooLarge error rather than pruning.
pub struct MaxNode {
    max: usize,
    count: Cell<usize>,
}

impl MaxNode {
    pub fn new(max: usize) -> Self {
        MaxNode {
            max,
            count: Cell::new(0),
        }
    }

    fn bump(&self) -> Result<bool> {
        let n = self.count.get() + 1;
        self.count.set(n);
        if n > self.max {
            return Err(TrellisError::MaxNodesExceeded { max: self.max });
        }
        Ok(true)
    }
}

impl Constraint for MaxNode {
    fn check_container_post(&self, _r: &ChildRequest, child: Option<&Selection>) -> Result<bool> {
        if child.is_some() {
            return self.bump();
        }
        Ok(true)
    }

    fn check_list_post(&self, _r: &ListRequest, child: Option<&Selection>) -> Result<bool> {
        if child.is_some() {
            return self.bump();
        }
        Ok(true)
    }

    fn check_field_post(&self, _r: &FieldRequest, hnd: &mut ValueHandle) -> Result<bool> {
        if hnd.val.is_some() {
            return self.bump();
        }
        Ok(true)
    }
}
