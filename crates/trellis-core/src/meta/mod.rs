//! Schema model
//!
//! The definition tree of a data model: modules, containers, lists,
//! leaves, choices, groupings, rpcs, notifications, and the rest of the
//! taxonomy. A `Schema` owns every definition in an arena addressed by
//! `DefId`; definitions are plain records holding id references to their
//! parent and children, so the tree is shared and immutable once
//! `finalize()` has run.
//!
//! Algorithms query capabilities (`details`, `leaf_type`, `key_meta`)
//! rather than matching concrete kinds wherever possible.

pub mod builder;
pub mod resolve;
pub mod types;

use std::rc::Rc;

use trellis_core_types::Type;

use crate::errors::{Result, TrellisError};
use types::TypeSpec;

/// Arena index of a definition inside its `Schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(pub(crate) u32);

/// Indication of definition obsolescence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

/// User extension annotation attached to a definition
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub prefix: String,
    pub ident: String,
    pub argument: Option<String>,
}

/// Config-ness and mandatory-ness attached to a definition.
/// Unset values inherit per `Schema::config`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Details {
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderedBy {
    #[default]
    System,
    User,
}

/// Cardinality and ordering attached to a list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListDetails {
    pub min_elements: Option<u64>,
    pub max_elements: Option<u64>,
    pub unbounded: Option<bool>,
    pub ordered_by: OrderedBy,
}

/// Override applied by a `uses` to one definition of its grouping
#[derive(Debug, Clone, Default)]
pub struct Refine {
    pub target: String,
    pub description: Option<String>,
    pub default_value: Option<String>,
    pub config: Option<bool>,
    pub mandatory: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct Revision {
    pub ident: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleMeta {
    pub namespace: String,
    pub prefix: String,
    pub revision: Option<Revision>,
    pub features: Vec<String>,
    pub imports: Vec<String>,
    pub includes: Vec<String>,
    pub children: Vec<DefId>,
    pub groupings: Vec<DefId>,
    pub typedefs: Vec<DefId>,
    pub augments: Vec<DefId>,
    pub identities: Vec<DefId>,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerMeta {
    pub details: Details,
    pub presence: Option<String>,
    pub children: Vec<DefId>,
    pub groupings: Vec<DefId>,
    pub typedefs: Vec<DefId>,
}

#[derive(Debug, Clone, Default)]
pub struct ListMeta {
    /// Key identifiers as declared; resolved to `keys` at finalization
    pub key_idents: Vec<String>,
    pub keys: Vec<DefId>,
    pub details: Details,
    pub list_details: ListDetails,
    pub children: Vec<DefId>,
    pub groupings: Vec<DefId>,
    pub typedefs: Vec<DefId>,
}

#[derive(Debug, Clone, Default)]
pub struct LeafMeta {
    /// Declared type; resolved through the typedef chain at finalization
    pub spec: TypeSpec,
    pub typ: Option<Rc<Type>>,
    pub details: Details,
}

#[derive(Debug, Clone, Default)]
pub struct AnyMeta {
    pub details: Details,
    pub typ: Option<Rc<Type>>,
}

#[derive(Debug, Clone, Default)]
pub struct UsesMeta {
    pub grouping: String,
    pub refines: Vec<Refine>,
    /// Filled by resolution; shared with the recursion target when the
    /// grouping references itself
    pub expanded: Vec<DefId>,
}

#[derive(Debug, Clone, Default)]
pub struct TypedefMeta {
    pub spec: TypeSpec,
}

#[derive(Debug, Clone, Default)]
pub struct RpcMeta {
    pub input: Option<DefId>,
    pub output: Option<DefId>,
}

#[derive(Debug, Clone, Default)]
pub struct AugmentMeta {
    /// Path to the target definition, relative to the module
    pub target: String,
    pub children: Vec<DefId>,
}

/// The kind-specific payload of a definition
#[derive(Debug, Clone)]
pub enum DefKind {
    Module(ModuleMeta),
    Container(ContainerMeta),
    List(ListMeta),
    Leaf(LeafMeta),
    LeafList(LeafMeta),
    AnyXml(AnyMeta),
    Choice { cases: Vec<DefId> },
    Case { children: Vec<DefId> },
    Grouping { children: Vec<DefId> },
    Uses(UsesMeta),
    Typedef(TypedefMeta),
    Rpc(RpcMeta),
    RpcInput { children: Vec<DefId> },
    RpcOutput { children: Vec<DefId> },
    Notification { children: Vec<DefId> },
    Augment(AugmentMeta),
    Identity { base: Option<String> },
}

/// One definition record: common attributes plus kind payload
#[derive(Debug, Clone)]
pub struct DefData {
    pub ident: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub status: Status,
    pub extensions: Vec<Extension>,
    /// Opaque `when` expression surfaced to providers, not evaluated
    pub when: Option<String>,
    /// Opaque `must` expressions surfaced to providers, not evaluated
    pub musts: Vec<String>,
    pub parent: Option<DefId>,
    /// Set when uses-expansion found this definition re-entering its own
    /// grouping; data depth bounds navigation below here
    pub recursive: bool,
    pub kind: DefKind,
}

impl DefData {
    pub(crate) fn new(ident: impl Into<String>, kind: DefKind) -> Self {
        DefData {
            ident: ident.into(),
            description: None,
            reference: None,
            status: Status::Current,
            extensions: Vec::new(),
            when: None,
            musts: Vec::new(),
            parent: None,
            recursive: false,
            kind,
        }
    }
}

/// The finalized, immutable definition tree of one module
#[derive(Debug)]
pub struct Schema {
    pub(crate) defs: Vec<DefData>,
    pub(crate) root: DefId,
}

impl Schema {
    pub fn root(&self) -> DefId {
        self.root
    }

    pub(crate) fn def(&self, id: DefId) -> &DefData {
        &self.defs[id.0 as usize]
    }

    pub fn ident(&self, id: DefId) -> &str {
        &self.def(id).ident
    }

    pub fn description(&self, id: DefId) -> Option<&str> {
        self.def(id).description.as_deref()
    }

    pub fn status(&self, id: DefId) -> Status {
        self.def(id).status
    }

    pub fn extensions(&self, id: DefId) -> &[Extension] {
        &self.def(id).extensions
    }

    pub fn when(&self, id: DefId) -> Option<&str> {
        self.def(id).when.as_deref()
    }

    pub fn musts(&self, id: DefId) -> &[String] {
        &self.def(id).musts
    }

    pub fn parent(&self, id: DefId) -> Option<DefId> {
        self.def(id).parent
    }

    pub fn is_recursive(&self, id: DefId) -> bool {
        self.def(id).recursive
    }

    // ===== capability queries =====

    pub fn is_leaf(&self, id: DefId) -> bool {
        matches!(
            self.def(id).kind,
            DefKind::Leaf(_) | DefKind::LeafList(_) | DefKind::AnyXml(_)
        )
    }

    pub fn is_list(&self, id: DefId) -> bool {
        matches!(self.def(id).kind, DefKind::List(_))
    }

    pub fn is_choice(&self, id: DefId) -> bool {
        matches!(self.def(id).kind, DefKind::Choice { .. })
    }

    pub fn is_rpc(&self, id: DefId) -> bool {
        matches!(self.def(id).kind, DefKind::Rpc(_))
    }

    pub fn is_notification(&self, id: DefId) -> bool {
        matches!(self.def(id).kind, DefKind::Notification { .. })
    }

    /// True for definitions that hold data children: module, container,
    /// list, case, rpc io, notification, grouping.
    pub fn has_children(&self, id: DefId) -> bool {
        self.children(id).is_some()
    }

    /// Direct children, unresolved (uses and choice appear as themselves)
    pub fn children(&self, id: DefId) -> Option<&[DefId]> {
        match &self.def(id).kind {
            DefKind::Module(m) => Some(&m.children),
            DefKind::Container(c) => Some(&c.children),
            DefKind::List(l) => Some(&l.children),
            DefKind::Case { children }
            | DefKind::Grouping { children }
            | DefKind::RpcInput { children }
            | DefKind::RpcOutput { children }
            | DefKind::Notification { children } => Some(children),
            _ => None,
        }
    }

    /// Details when the definition carries config/mandatory-ness
    pub fn details(&self, id: DefId) -> Option<&Details> {
        match &self.def(id).kind {
            DefKind::Container(c) => Some(&c.details),
            DefKind::List(l) => Some(&l.details),
            DefKind::Leaf(l) | DefKind::LeafList(l) => Some(&l.details),
            DefKind::AnyXml(a) => Some(&a.details),
            _ => None,
        }
    }

    /// Cardinality/ordering details when the definition is a list
    pub fn list_details(&self, id: DefId) -> Option<&ListDetails> {
        match &self.def(id).kind {
            DefKind::List(l) => Some(&l.list_details),
            _ => None,
        }
    }

    /// Presence statement when the definition is a presence container
    pub fn presence(&self, id: DefId) -> Option<&str> {
        match &self.def(id).kind {
            DefKind::Container(c) => c.presence.as_deref(),
            _ => None,
        }
    }

    /// Resolved data type when the definition is leaf-like
    pub fn leaf_type(&self, id: DefId) -> Option<&Rc<Type>> {
        match &self.def(id).kind {
            DefKind::Leaf(l) | DefKind::LeafList(l) => l.typ.as_ref(),
            DefKind::AnyXml(a) => a.typ.as_ref(),
            _ => None,
        }
    }

    /// Effective default through the typedef chain, when one is declared
    pub fn default_for(&self, id: DefId) -> Option<&str> {
        self.leaf_type(id)?.default_value.as_deref()
    }

    /// Ordered key leaf definitions of a list
    pub fn key_meta(&self, id: DefId) -> &[DefId] {
        match &self.def(id).kind {
            DefKind::List(l) => &l.keys,
            _ => &[],
        }
    }

    pub fn rpc(&self, id: DefId) -> Option<&RpcMeta> {
        match &self.def(id).kind {
            DefKind::Rpc(r) => Some(r),
            _ => None,
        }
    }

    pub fn choice_cases(&self, id: DefId) -> &[DefId] {
        match &self.def(id).kind {
            DefKind::Choice { cases } => cases,
            _ => &[],
        }
    }

    /// Effective config-ness with container inheritance: a definition
    /// with config unset inherits from its parent; an explicit
    /// `config false` anywhere on the chain makes all descendants
    /// non-config.
    pub fn config(&self, id: DefId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(d) = self.details(c) {
                if d.config == Some(false) {
                    return false;
                }
            }
            cur = self.parent(c);
        }
        true
    }

    // ===== navigation =====

    /// Find a direct definition by name, honoring choice/case
    /// transparency and uses expansion: names inside a case are visible
    /// through the enclosing choice, and grouping content is visible at
    /// the uses site.
    pub fn find_by_ident(&self, parent: DefId, ident: &str) -> Option<DefId> {
        for child in self.iterate(parent, true) {
            if self.ident(child) == ident {
                return Some(child);
            }
        }
        // choices themselves remain addressable by name
        if let Some(children) = self.children(parent) {
            for &child in children {
                if self.is_choice(child) && self.ident(child) == ident {
                    return Some(child);
                }
            }
        }
        None
    }

    /// Resolve a `/`-separated identifier path from `root`
    pub fn find_by_path(&self, root: DefId, path: &str) -> Option<DefId> {
        let mut at = root;
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            at = self.find_by_ident(at, seg)?;
        }
        Some(at)
    }

    /// Like `find_by_ident` but errors with the container name attached
    pub fn require_ident(&self, parent: DefId, ident: &str) -> Result<DefId> {
        self.find_by_ident(parent, ident)
            .ok_or_else(|| TrellisError::DefNotFound {
                ident: ident.to_string(),
                container: self.ident(parent).to_string(),
            })
    }

    /// Children with uses expanded but choices kept as themselves; data
    /// walks recurse into a choice's active case explicitly.
    pub fn data_definitions(&self, parent: DefId) -> Vec<DefId> {
        let mut out = Vec::new();
        fn collect(schema: &Schema, ids: &[DefId], out: &mut Vec<DefId>) {
            for &id in ids {
                match &schema.def(id).kind {
                    DefKind::Uses(u) => collect(schema, &u.expanded, out),
                    _ => out.push(id),
                }
            }
        }
        match &self.def(parent).kind {
            DefKind::Choice { cases } => collect(self, cases, &mut out),
            _ => {
                if let Some(children) = self.children(parent) {
                    let children = children.to_vec();
                    collect(self, &children, &mut out);
                }
            }
        }
        out
    }

    /// Lazy iteration over the direct definitions of `parent`.
    ///
    /// With `resolve` true, `uses` yields its grouping's definitions
    /// (refines applied) and choice/case flatten to their leaf
    /// definitions; with `resolve` false, `uses` and `choice` are
    /// yielded as themselves.
    pub fn iterate(&self, parent: DefId, resolve: bool) -> DefIter<'_> {
        let children: Vec<DefId> = match &self.def(parent).kind {
            DefKind::Choice { cases } if resolve => cases.clone(),
            _ => self.children(parent).map(|c| c.to_vec()).unwrap_or_default(),
        };
        DefIter {
            schema: self,
            resolve,
            stack: vec![children.into_iter()],
        }
    }
}

/// Iterator produced by `Schema::iterate`
pub struct DefIter<'a> {
    schema: &'a Schema,
    resolve: bool,
    stack: Vec<std::vec::IntoIter<DefId>>,
}

impl<'a> Iterator for DefIter<'a> {
    type Item = DefId;

    fn next(&mut self) -> Option<DefId> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(id) = frame.next() else {
                self.stack.pop();
                continue;
            };
            if !self.resolve {
                return Some(id);
            }
            match &self.schema.def(id).kind {
                DefKind::Uses(u) => {
                    self.stack.push(u.expanded.clone().into_iter());
                }
                DefKind::Choice { cases } => {
                    self.stack.push(cases.clone().into_iter());
                }
                DefKind::Case { children } => {
                    self.stack.push(children.clone().into_iter());
                }
                _ => return Some(id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::builder::ModuleBuilder;
    use super::types::TypeSpec;

    #[test]
    fn test_find_by_ident_through_choice() {
        let schema = ModuleBuilder::new("m")
            .choice("body", |ch| {
                ch.case("a", |c| c.leaf("x", TypeSpec::new("string")))
                    .case("b", |c| c.leaf("y", TypeSpec::new("string")))
            })
            .finalize()
            .unwrap();

        let root = schema.root();
        // leaves inside cases are visible through the choice
        assert!(schema.find_by_ident(root, "x").is_some());
        assert!(schema.find_by_ident(root, "y").is_some());
        // the choice itself remains addressable
        let ch = schema.find_by_ident(root, "body").unwrap();
        assert!(schema.is_choice(ch));
    }

    #[test]
    fn test_find_by_path() {
        let schema = ModuleBuilder::new("m")
            .container("a", |c| {
                c.container("b", |b| b.leaf("x", TypeSpec::new("string")))
            })
            .finalize()
            .unwrap();

        let x = schema.find_by_path(schema.root(), "a/b/x").unwrap();
        assert_eq!(schema.ident(x), "x");
        assert!(schema.find_by_path(schema.root(), "a/q").is_none());
    }

    #[test]
    fn test_config_inheritance() {
        let schema = ModuleBuilder::new("m")
            .container_cfg("y", Some(false), |c| c.leaf("a", TypeSpec::new("string")))
            .container("z", |c| c.leaf("a", TypeSpec::new("string")))
            .finalize()
            .unwrap();

        let y = schema.find_by_path(schema.root(), "y").unwrap();
        let ya = schema.find_by_path(schema.root(), "y/a").unwrap();
        let za = schema.find_by_path(schema.root(), "z/a").unwrap();
        assert!(!schema.config(y));
        assert!(!schema.config(ya));
        assert!(schema.config(za));
    }

    #[test]
    fn test_iterate_unresolved_yields_uses() {
        let schema = ModuleBuilder::new("m")
            .grouping("common", |g| g.leaf("shared", TypeSpec::new("string")))
            .uses("common")
            .finalize()
            .unwrap();

        let raw: Vec<&str> = schema
            .iterate(schema.root(), false)
            .map(|d| schema.ident(d))
            .collect();
        assert_eq!(raw, vec!["common"]);

        let resolved: Vec<&str> = schema
            .iterate(schema.root(), true)
            .map(|d| schema.ident(d))
            .collect();
        assert_eq!(resolved, vec!["shared"]);
    }
}
