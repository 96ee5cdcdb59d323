//! Schema construction
//!
//! Construction is driven externally; a text parser would drive the same
//! API this fluent builder exposes. Building ends in `finalize()`, which
//! resolves uses/augments/typedefs exactly once and freezes the tree.

use std::rc::Rc;

use crate::errors::Result;
use crate::meta::resolve;
use crate::meta::types::TypeSpec;
use crate::meta::{
    AnyMeta, AugmentMeta, ContainerMeta, DefData, DefId, DefKind, Details, LeafMeta, ListMeta,
    ModuleMeta, Refine, Revision, RpcMeta, Schema, TypedefMeta, UsesMeta,
};

fn push(defs: &mut Vec<DefData>, mut def: DefData, parent: DefId) -> DefId {
    let id = DefId(defs.len() as u32);
    def.parent = Some(parent);
    defs.push(def);
    attach(defs, parent, id);
    id
}

/// Register a new definition in the right child list of its parent
fn attach(defs: &mut Vec<DefData>, parent: DefId, id: DefId) {
    let routed = match defs[id.0 as usize].kind {
        DefKind::Grouping { .. } => route_grouping(defs, parent, id),
        DefKind::Typedef(_) => route_typedef(defs, parent, id),
        DefKind::Augment(_) | DefKind::Identity { .. } => route_module(defs, parent, id),
        _ => false,
    };
    if routed {
        return;
    }
    match &mut defs[parent.0 as usize].kind {
        DefKind::Module(m) => m.children.push(id),
        DefKind::Container(c) => c.children.push(id),
        DefKind::List(l) => l.children.push(id),
        DefKind::Choice { cases } => cases.push(id),
        DefKind::Case { children }
        | DefKind::Grouping { children }
        | DefKind::RpcInput { children }
        | DefKind::RpcOutput { children }
        | DefKind::Notification { children } => children.push(id),
        DefKind::Augment(a) => a.children.push(id),
        _ => panic!("definition {} cannot hold children", defs[parent.0 as usize].ident),
    }
}

fn route_grouping(defs: &mut Vec<DefData>, parent: DefId, id: DefId) -> bool {
    let mut at = Some(parent);
    while let Some(p) = at {
        let idx = p.0 as usize;
        match &mut defs[idx].kind {
            DefKind::Module(m) => {
                m.groupings.push(id);
                return true;
            }
            DefKind::Container(c) => {
                c.groupings.push(id);
                return true;
            }
            DefKind::List(l) => {
                l.groupings.push(id);
                return true;
            }
            _ => {}
        }
        at = defs[idx].parent;
    }
    false
}

fn route_typedef(defs: &mut Vec<DefData>, parent: DefId, id: DefId) -> bool {
    let mut at = Some(parent);
    while let Some(p) = at {
        let idx = p.0 as usize;
        match &mut defs[idx].kind {
            DefKind::Module(m) => {
                m.typedefs.push(id);
                return true;
            }
            DefKind::Container(c) => {
                c.typedefs.push(id);
                return true;
            }
            DefKind::List(l) => {
                l.typedefs.push(id);
                return true;
            }
            _ => {}
        }
        at = defs[idx].parent;
    }
    false
}

fn route_module(defs: &mut Vec<DefData>, parent: DefId, id: DefId) -> bool {
    let is_augment = matches!(defs[id.0 as usize].kind, DefKind::Augment(_));
    let mut at = Some(parent);
    while let Some(p) = at {
        let idx = p.0 as usize;
        if let DefKind::Module(m) = &mut defs[idx].kind {
            if is_augment {
                m.augments.push(id);
            } else {
                m.identities.push(id);
            }
            return true;
        }
        at = defs[idx].parent;
    }
    false
}

/// Cursor used inside building closures to add definitions under one
/// parent. The cursor owns the definition arena while building and
/// threads it through nested closures; methods chain by value.
pub struct Body {
    defs: Vec<DefData>,
    parent: DefId,
}

impl Body {
    fn nested(mut self, ident: &str, kind: DefKind, f: impl FnOnce(Body) -> Body) -> Body {
        let parent = self.parent;
        let id = push(&mut self.defs, DefData::new(ident, kind), parent);
        let child = Body {
            defs: self.defs,
            parent: id,
        };
        let mut done = f(child);
        done.parent = parent;
        done
    }

    fn added(mut self, ident: &str, kind: DefKind) -> Body {
        push(&mut self.defs, DefData::new(ident, kind), self.parent);
        self
    }

    pub fn container(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(ident, DefKind::Container(ContainerMeta::default()), f)
    }

    pub fn container_cfg(
        self,
        ident: &str,
        config: Option<bool>,
        f: impl FnOnce(Body) -> Body,
    ) -> Body {
        self.nested(
            ident,
            DefKind::Container(ContainerMeta {
                details: Details {
                    config,
                    mandatory: None,
                },
                ..Default::default()
            }),
            f,
        )
    }

    /// Container with a presence statement
    pub fn presence_container(
        self,
        ident: &str,
        presence: &str,
        f: impl FnOnce(Body) -> Body,
    ) -> Body {
        self.nested(
            ident,
            DefKind::Container(ContainerMeta {
                presence: Some(presence.to_string()),
                ..Default::default()
            }),
            f,
        )
    }

    pub fn list(self, ident: &str, keys: &[&str], f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(
            ident,
            DefKind::List(ListMeta {
                key_idents: keys.iter().map(|k| k.to_string()).collect(),
                ..Default::default()
            }),
            f,
        )
    }

    pub fn leaf(self, ident: &str, spec: TypeSpec) -> Body {
        self.added(
            ident,
            DefKind::Leaf(LeafMeta {
                spec,
                ..Default::default()
            }),
        )
    }

    pub fn leaf_detailed(self, ident: &str, spec: TypeSpec, details: Details) -> Body {
        self.added(
            ident,
            DefKind::Leaf(LeafMeta {
                spec,
                typ: None,
                details,
            }),
        )
    }

    pub fn leaf_list(self, ident: &str, spec: TypeSpec) -> Body {
        self.added(
            ident,
            DefKind::LeafList(LeafMeta {
                spec,
                ..Default::default()
            }),
        )
    }

    pub fn anyxml(self, ident: &str) -> Body {
        self.added(ident, DefKind::AnyXml(AnyMeta::default()))
    }

    pub fn choice(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(ident, DefKind::Choice { cases: Vec::new() }, f)
    }

    /// One case of an enclosing choice
    pub fn case(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(ident, DefKind::Case { children: Vec::new() }, f)
    }

    pub fn uses(self, grouping: &str) -> Body {
        let kind = DefKind::Uses(UsesMeta {
            grouping: grouping.to_string(),
            ..Default::default()
        });
        self.added(grouping, kind)
    }

    pub fn uses_refined(self, grouping: &str, refines: Vec<Refine>) -> Body {
        let kind = DefKind::Uses(UsesMeta {
            grouping: grouping.to_string(),
            refines,
            expanded: Vec::new(),
        });
        self.added(grouping, kind)
    }

    pub fn grouping(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(ident, DefKind::Grouping { children: Vec::new() }, f)
    }

    pub fn typedef(self, ident: &str, spec: TypeSpec) -> Body {
        self.added(ident, DefKind::Typedef(TypedefMeta { spec }))
    }

    pub fn rpc(mut self, ident: &str, f: impl FnOnce(RpcBody) -> RpcBody) -> Body {
        let parent = self.parent;
        let id = push(
            &mut self.defs,
            DefData::new(ident, DefKind::Rpc(RpcMeta::default())),
            parent,
        );
        let rb = RpcBody {
            defs: self.defs,
            rpc: id,
        };
        let done = f(rb);
        Body {
            defs: done.defs,
            parent,
        }
    }

    pub fn notification(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Body {
        self.nested(ident, DefKind::Notification { children: Vec::new() }, f)
    }

    /// Attach a description to the most recently added definition
    pub fn description(mut self, text: &str) -> Body {
        if let Some(last) = self.defs.last_mut() {
            last.description = Some(text.to_string());
        }
        self
    }

    /// Attach a `when` expression to the most recently added definition
    pub fn when(mut self, expr: &str) -> Body {
        if let Some(last) = self.defs.last_mut() {
            last.when = Some(expr.to_string());
        }
        self
    }

    /// Attach a `must` expression to the most recently added definition
    pub fn must(mut self, expr: &str) -> Body {
        if let Some(last) = self.defs.last_mut() {
            last.musts.push(expr.to_string());
        }
        self
    }
}

/// Cursor for rpc input/output construction
pub struct RpcBody {
    defs: Vec<DefData>,
    rpc: DefId,
}

impl RpcBody {
    pub fn input(mut self, f: impl FnOnce(Body) -> Body) -> RpcBody {
        let rpc = self.rpc;
        let id = push(
            &mut self.defs,
            DefData::new("input", DefKind::RpcInput { children: Vec::new() }),
            rpc,
        );
        if let DefKind::Rpc(r) = &mut self.defs[rpc.0 as usize].kind {
            r.input = Some(id);
        }
        let body = Body {
            defs: self.defs,
            parent: id,
        };
        let done = f(body);
        RpcBody {
            defs: done.defs,
            rpc,
        }
    }

    pub fn output(mut self, f: impl FnOnce(Body) -> Body) -> RpcBody {
        let rpc = self.rpc;
        let id = push(
            &mut self.defs,
            DefData::new("output", DefKind::RpcOutput { children: Vec::new() }),
            rpc,
        );
        if let DefKind::Rpc(r) = &mut self.defs[rpc.0 as usize].kind {
            r.output = Some(id);
        }
        let body = Body {
            defs: self.defs,
            parent: id,
        };
        let done = f(body);
        RpcBody {
            defs: done.defs,
            rpc,
        }
    }
}

/// Entry point for building one module
pub struct ModuleBuilder {
    defs: Vec<DefData>,
    root: DefId,
}

impl ModuleBuilder {
    pub fn new(ident: &str) -> Self {
        let module = DefData::new(ident, DefKind::Module(ModuleMeta::default()));
        ModuleBuilder {
            defs: vec![module],
            root: DefId(0),
        }
    }

    pub fn namespace(mut self, ns: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.namespace = ns.to_string();
        }
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.prefix = prefix.to_string();
        }
        self
    }

    pub fn revision(mut self, ident: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.revision = Some(Revision {
                ident: ident.to_string(),
                description: None,
            });
        }
        self
    }

    pub fn feature(mut self, ident: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.features.push(ident.to_string());
        }
        self
    }

    pub fn import(mut self, ident: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.imports.push(ident.to_string());
        }
        self
    }

    pub fn include(mut self, ident: &str) -> Self {
        if let DefKind::Module(m) = &mut self.defs[0].kind {
            m.includes.push(ident.to_string());
        }
        self
    }

    pub fn identity(mut self, ident: &str, base: Option<&str>) -> Self {
        let def = DefData::new(
            ident,
            DefKind::Identity {
                base: base.map(|b| b.to_string()),
            },
        );
        push(&mut self.defs, def, self.root);
        self
    }

    /// Splice definitions into `target` (module-relative path) at
    /// finalization; `when` is carried onto each spliced definition.
    pub fn augment(
        mut self,
        target: &str,
        when: Option<&str>,
        f: impl FnOnce(Body) -> Body,
    ) -> Self {
        let mut def = DefData::new(
            target,
            DefKind::Augment(AugmentMeta {
                target: target.to_string(),
                children: Vec::new(),
            }),
        );
        def.when = when.map(|w| w.to_string());
        let id = push(&mut self.defs, def, self.root);
        self.with_body_at(id, f)
    }

    /// Hand the arena to a closure-scoped cursor and take it back
    fn with_body_at(mut self, parent: DefId, f: impl FnOnce(Body) -> Body) -> Self {
        let body = Body {
            defs: std::mem::take(&mut self.defs),
            parent,
        };
        let done = f(body);
        self.defs = done.defs;
        self
    }

    pub fn container(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.container(ident, f))
    }

    pub fn container_cfg(
        self,
        ident: &str,
        config: Option<bool>,
        f: impl FnOnce(Body) -> Body,
    ) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.container_cfg(ident, config, f))
    }

    pub fn list(self, ident: &str, keys: &[&str], f: impl FnOnce(Body) -> Body) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.list(ident, keys, f))
    }

    pub fn leaf(self, ident: &str, spec: TypeSpec) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.leaf(ident, spec))
    }

    pub fn leaf_list(self, ident: &str, spec: TypeSpec) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.leaf_list(ident, spec))
    }

    pub fn anyxml(self, ident: &str) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.anyxml(ident))
    }

    pub fn choice(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.choice(ident, f))
    }

    pub fn uses(self, grouping: &str) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.uses(grouping))
    }

    pub fn uses_refined(self, grouping: &str, refines: Vec<Refine>) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.uses_refined(grouping, refines))
    }

    pub fn grouping(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.grouping(ident, f))
    }

    pub fn typedef(self, ident: &str, spec: TypeSpec) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.typedef(ident, spec))
    }

    pub fn rpc(self, ident: &str, f: impl FnOnce(RpcBody) -> RpcBody) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.rpc(ident, f))
    }

    pub fn notification(self, ident: &str, f: impl FnOnce(Body) -> Body) -> Self {
        let root = self.root;
        self.with_body_at(root, |b| b.notification(ident, f))
    }

    /// Resolve uses/augments/typedefs/list keys and freeze the tree
    pub fn finalize(self) -> Result<Rc<Schema>> {
        let mut schema = Schema {
            defs: self.defs,
            root: self.root,
        };
        resolve::finalize(&mut schema)?;
        Ok(Rc::new(schema))
    }
}
