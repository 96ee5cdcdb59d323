//! Field inclusion and exclusion expressions
//!
//! Expressions are dot-separated ident paths with `;` separating
//! alternatives, matched against the selection path relative to the
//! point the constraint was installed: `fields=a.b;c` keeps `a/b`'s
//! subtree and `c`'s subtree, plus the containers on the way to them.

use crate::constraints::{rel_idents, Constraint};
use crate::errors::{Result, TrellisError};
use crate::node::{ChildRequest, FieldRequest, ListRequest, Selection, ValueHandle};

fn parse_exprs(expr: &str) -> Result<Vec<Vec<String>>> {
    let mut exprs = Vec::new();
    for alt in expr.split(';') {
        if alt.is_empty() {
            continue;
        }
        let segs: Vec<String> = alt.split('.').map(|s| s.to_string()).collect();
        if segs.iter().any(|s| s.is_empty()) {
            return Err(TrellisError::PathSyntax {
                reason: format!("empty segment in fields expression {}", expr),
            });
        }
        exprs.push(segs);
    }
    if exprs.is_empty() {
        return Err(TrellisError::PathSyntax {
            reason: "empty fields expression".to_string(),
        });
    }
    Ok(exprs)
}

fn starts_with(path: &[String], prefix: &[String]) -> bool {
    prefix.len() <= path.len() && path.iter().zip(prefix).all(|(a, b)| a == b)
}

/// Keeps only the subtrees named by the expression
pub struct FieldsMatcher {
    base: usize,
    exprs: Vec<Vec<String>>,
}

impl FieldsMatcher {
    pub fn parse(base: usize, expr: &str) -> Result<Self> {
        Ok(FieldsMatcher {
            base,
            exprs: parse_exprs(expr)?,
        })
    }

    fn child_path(&self, sel: &Selection, ident: &str) -> Vec<String> {
        let mut rel = rel_idents(sel.path(), self.base);
        rel.push(ident.to_string());
        rel
    }

    /// Containers open when they are on the way to a match or inside one
    fn container_allowed(&self, rel: &[String]) -> bool {
        self.exprs
            .iter()
            .any(|e| starts_with(rel, e) || starts_with(e, rel))
    }

    /// Leaves appear only inside a matched subtree
    fn field_allowed(&self, rel: &[String]) -> bool {
        self.exprs.iter().any(|e| starts_with(rel, e))
    }
}

impl Constraint for FieldsMatcher {
    fn check_container_pre(&self, r: &ChildRequest) -> Result<bool> {
        let rel = self.child_path(&r.sel, r.sel.schema().ident(r.meta));
        Ok(self.container_allowed(&rel))
    }

    fn check_list_pre(&self, r: &mut ListRequest) -> Result<bool> {
        let rel = rel_idents(r.sel.path(), self.base);
        Ok(self.container_allowed(&rel))
    }

    fn check_field_pre(&self, r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        let rel = self.child_path(&r.sel, r.sel.schema().ident(r.meta));
        Ok(self.field_allowed(&rel))
    }
}

/// Drops the subtrees named by the expression
pub struct ExcludeFieldsMatcher {
    base: usize,
    exprs: Vec<Vec<String>>,
}

impl ExcludeFieldsMatcher {
    pub fn parse(base: usize, expr: &str) -> Result<Self> {
        Ok(ExcludeFieldsMatcher {
            base,
            exprs: parse_exprs(expr)?,
        })
    }

    fn excluded(&self, rel: &[String]) -> bool {
        self.exprs.iter().any(|e| starts_with(rel, e))
    }
}

impl Constraint for ExcludeFieldsMatcher {
    fn check_container_pre(&self, r: &ChildRequest) -> Result<bool> {
        let mut rel = rel_idents(r.sel.path(), self.base);
        rel.push(r.sel.schema().ident(r.meta).to_string());
        Ok(!self.excluded(&rel))
    }

    fn check_field_pre(&self, r: &FieldRequest, _hnd: &mut ValueHandle) -> Result<bool> {
        let mut rel = rel_idents(r.sel.path(), self.base);
        rel.push(r.sel.schema().ident(r.meta).to_string());
        Ok(!self.excluded(&rel))
    }
}
