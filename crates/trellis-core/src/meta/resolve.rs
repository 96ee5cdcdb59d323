//! Schema finalization
//!
//! Runs exactly once, from `ModuleBuilder::finalize()`:
//!
//! 1. `uses` expansion: each grouping reference is cloned in place with
//!    refines applied. Expansion keeps an ancestor set of grouping
//!    identities; re-entering a grouping marks the containing definition
//!    `recursive` and shares the outer expansion instead of cloning
//!    further, so navigation over data uses the data's depth as the
//!    recursion fuel.
//! 2. Augment splicing: target located by module-relative path,
//!    definitions appended with parent rewritten and `when` carried.
//! 3. Type resolution: typedef chains collapse to a terminal format;
//!    enumeration labels get bijective ids (explicit value, else
//!    previous+1 starting at 0).
//! 4. List key resolution: key identifiers must name direct leaf
//!    children.

use std::rc::Rc;

use trellis_core_types::{EnumEntry, Format, Type};

use crate::errors::{Result, TrellisError};
use crate::meta::types::TypeSpec;
use crate::meta::{DefData, DefId, DefKind, Refine, Schema};

pub(crate) fn finalize(schema: &mut Schema) -> Result<()> {
    let mut ctx = UsesCtx::default();
    expand_subtree(schema, schema.root, &mut ctx)?;
    apply_recursion_patches(schema, &ctx);
    splice_augments(schema)?;
    resolve_types(schema)?;
    resolve_list_keys(schema)?;
    Ok(())
}

#[derive(Default)]
struct UsesCtx {
    /// (grouping, uses currently expanding it)
    in_progress: Vec<(DefId, DefId)>,
    /// (inner uses that re-entered, outer uses to share content with)
    patches: Vec<(DefId, DefId)>,
}

/// All child ids a finalization walk must visit, across every kind
fn walk_children(schema: &Schema, id: DefId) -> Vec<DefId> {
    match &schema.defs[id.0 as usize].kind {
        DefKind::Choice { cases } => cases.clone(),
        DefKind::Rpc(r) => r.input.iter().chain(r.output.iter()).copied().collect(),
        DefKind::Augment(a) => a.children.clone(),
        _ => schema.children(id).map(|c| c.to_vec()).unwrap_or_default(),
    }
}

fn expand_subtree(schema: &mut Schema, id: DefId, ctx: &mut UsesCtx) -> Result<()> {
    for child in walk_children(schema, id) {
        if matches!(schema.defs[child.0 as usize].kind, DefKind::Uses(_)) {
            expand_uses(schema, child, id, ctx)?;
        } else {
            expand_subtree(schema, child, ctx)?;
        }
    }
    Ok(())
}

fn expand_uses(schema: &mut Schema, uses_id: DefId, parent: DefId, ctx: &mut UsesCtx) -> Result<()> {
    let grouping_name = match &schema.defs[uses_id.0 as usize].kind {
        DefKind::Uses(u) => u.grouping.clone(),
        _ => unreachable!(),
    };
    let grouping = find_grouping(schema, parent, &grouping_name)?;

    if let Some(&(_, outer)) = ctx.in_progress.iter().find(|(g, _)| *g == grouping) {
        // re-entered a grouping being expanded: mark and share later
        schema.defs[parent.0 as usize].recursive = true;
        ctx.patches.push((uses_id, outer));
        return Ok(());
    }

    ctx.in_progress.push((grouping, uses_id));

    let template: Vec<DefId> = match &schema.defs[grouping.0 as usize].kind {
        DefKind::Grouping { children } => children.clone(),
        _ => unreachable!(),
    };
    let mut expanded = Vec::with_capacity(template.len());
    for t in template {
        expanded.push(deep_clone(schema, t, parent));
    }

    let refines = match &schema.defs[uses_id.0 as usize].kind {
        DefKind::Uses(u) => u.refines.clone(),
        _ => unreachable!(),
    };
    for refine in &refines {
        apply_refine(schema, &expanded, refine)?;
    }

    for &c in &expanded {
        if matches!(schema.defs[c.0 as usize].kind, DefKind::Uses(_)) {
            expand_uses(schema, c, parent, ctx)?;
        } else {
            expand_subtree(schema, c, ctx)?;
        }
    }

    if let DefKind::Uses(u) = &mut schema.defs[uses_id.0 as usize].kind {
        u.expanded = expanded;
    }
    ctx.in_progress.pop();
    Ok(())
}

fn apply_recursion_patches(schema: &mut Schema, ctx: &UsesCtx) {
    for &(inner, outer) in &ctx.patches {
        let shared = match &schema.defs[outer.0 as usize].kind {
            DefKind::Uses(u) => u.expanded.clone(),
            _ => continue,
        };
        if let DefKind::Uses(u) = &mut schema.defs[inner.0 as usize].kind {
            u.expanded = shared;
        }
    }
}

/// Clone a definition subtree under a new parent, assigning fresh ids
fn deep_clone(schema: &mut Schema, src: DefId, parent: DefId) -> DefId {
    let mut copy: DefData = schema.defs[src.0 as usize].clone();
    copy.parent = Some(parent);
    let id = DefId(schema.defs.len() as u32);
    schema.defs.push(copy);

    // rebuild child id vectors with cloned subtrees
    macro_rules! clone_vec {
        ($v:expr) => {{
            let old: Vec<DefId> = $v;
            let mut fresh = Vec::with_capacity(old.len());
            for o in old {
                fresh.push(deep_clone(schema, o, id));
            }
            fresh
        }};
    }

    let kind = schema.defs[id.0 as usize].kind.clone();
    let rebuilt = match kind {
        DefKind::Container(mut c) => {
            c.children = clone_vec!(c.children);
            c.groupings = clone_vec!(c.groupings);
            c.typedefs = clone_vec!(c.typedefs);
            DefKind::Container(c)
        }
        DefKind::List(mut l) => {
            l.children = clone_vec!(l.children);
            l.groupings = clone_vec!(l.groupings);
            l.typedefs = clone_vec!(l.typedefs);
            l.keys = Vec::new();
            DefKind::List(l)
        }
        DefKind::Choice { cases } => DefKind::Choice {
            cases: clone_vec!(cases),
        },
        DefKind::Case { children } => DefKind::Case {
            children: clone_vec!(children),
        },
        DefKind::Grouping { children } => DefKind::Grouping {
            children: clone_vec!(children),
        },
        DefKind::Notification { children } => DefKind::Notification {
            children: clone_vec!(children),
        },
        DefKind::RpcInput { children } => DefKind::RpcInput {
            children: clone_vec!(children),
        },
        DefKind::RpcOutput { children } => DefKind::RpcOutput {
            children: clone_vec!(children),
        },
        DefKind::Rpc(mut r) => {
            r.input = r.input.map(|i| deep_clone(schema, i, id));
            r.output = r.output.map(|o| deep_clone(schema, o, id));
            DefKind::Rpc(r)
        }
        DefKind::Uses(mut u) => {
            // clones are re-expanded in their new scope
            u.expanded = Vec::new();
            DefKind::Uses(u)
        }
        other => other,
    };
    schema.defs[id.0 as usize].kind = rebuilt;
    id
}

fn apply_refine(schema: &mut Schema, expanded: &[DefId], refine: &Refine) -> Result<()> {
    let not_found = || TrellisError::DefNotFound {
        ident: refine.target.clone(),
        container: "grouping expansion".to_string(),
    };
    let mut segs = refine.target.split('/').filter(|s| !s.is_empty());
    let first = segs.next().ok_or_else(not_found)?;
    let mut target = expanded
        .iter()
        .copied()
        .find(|&d| schema.ident(d) == first)
        .ok_or_else(not_found)?;
    for seg in segs {
        target = schema.find_by_ident(target, seg).ok_or_else(not_found)?;
    }

    let def = &mut schema.defs[target.0 as usize];
    if let Some(desc) = &refine.description {
        def.description = Some(desc.clone());
    }
    match &mut def.kind {
        DefKind::Leaf(l) | DefKind::LeafList(l) => {
            if let Some(d) = &refine.default_value {
                l.spec.default_value = Some(d.clone());
            }
            if refine.config.is_some() {
                l.details.config = refine.config;
            }
            if refine.mandatory.is_some() {
                l.details.mandatory = refine.mandatory;
            }
        }
        DefKind::Container(c) => {
            if refine.config.is_some() {
                c.details.config = refine.config;
            }
            if refine.mandatory.is_some() {
                c.details.mandatory = refine.mandatory;
            }
        }
        DefKind::List(l) => {
            if refine.config.is_some() {
                l.details.config = refine.config;
            }
        }
        _ => {}
    }
    Ok(())
}

fn find_grouping(schema: &Schema, from: DefId, name: &str) -> Result<DefId> {
    let mut at = Some(from);
    while let Some(p) = at {
        let groupings: &[DefId] = match &schema.defs[p.0 as usize].kind {
            DefKind::Module(m) => &m.groupings,
            DefKind::Container(c) => &c.groupings,
            DefKind::List(l) => &l.groupings,
            _ => &[],
        };
        for &g in groupings {
            if schema.ident(g) == name {
                return Ok(g);
            }
        }
        at = schema.parent(p);
    }
    Err(TrellisError::DefNotFound {
        ident: name.to_string(),
        container: "groupings in scope".to_string(),
    })
}

fn splice_augments(schema: &mut Schema) -> Result<()> {
    let augments: Vec<DefId> = match &schema.defs[schema.root.0 as usize].kind {
        DefKind::Module(m) => m.augments.clone(),
        _ => Vec::new(),
    };
    for aug in augments {
        let (target_path, children, when) = match &schema.defs[aug.0 as usize] {
            DefData {
                kind: DefKind::Augment(a),
                when,
                ..
            } => (a.target.clone(), a.children.clone(), when.clone()),
            _ => continue,
        };
        let target = schema
            .find_by_path(schema.root, &target_path)
            .ok_or_else(|| TrellisError::DefNotFound {
                ident: target_path.clone(),
                container: schema.ident(schema.root).to_string(),
            })?;
        for child in children {
            let def = &mut schema.defs[child.0 as usize];
            def.parent = Some(target);
            if def.when.is_none() {
                def.when = when.clone();
            }
            match &mut schema.defs[target.0 as usize].kind {
                DefKind::Module(m) => m.children.push(child),
                DefKind::Container(c) => c.children.push(child),
                DefKind::List(l) => l.children.push(child),
                DefKind::Case { children } | DefKind::Notification { children } => {
                    children.push(child)
                }
                _ => {
                    return Err(TrellisError::Internal {
                        message: format!("augment target {} cannot hold children", target_path),
                    })
                }
            }
            // spliced content may carry its own uses
            let mut ctx = UsesCtx::default();
            if matches!(schema.defs[child.0 as usize].kind, DefKind::Uses(_)) {
                expand_uses(schema, child, target, &mut ctx)?;
            } else {
                expand_subtree(schema, child, &mut ctx)?;
            }
            apply_recursion_patches(schema, &ctx);
        }
    }
    Ok(())
}

fn resolve_types(schema: &mut Schema) -> Result<()> {
    // collect declared specs first, then resolve against the frozen tree
    let mut work: Vec<(DefId, Option<(TypeSpec, bool)>)> = Vec::new();
    for (i, def) in schema.defs.iter().enumerate() {
        let id = DefId(i as u32);
        match &def.kind {
            DefKind::Leaf(l) => work.push((id, Some((l.spec.clone(), false)))),
            DefKind::LeafList(l) => work.push((id, Some((l.spec.clone(), true)))),
            DefKind::AnyXml(_) => work.push((id, None)),
            _ => {}
        }
    }
    let mut resolved: Vec<(DefId, Rc<Type>)> = Vec::with_capacity(work.len());
    for (id, spec) in work {
        let t = match spec {
            Some((spec, as_list)) => resolve_spec(schema, id, &spec, as_list)?,
            None => Rc::new(Type::new("anydata", Format::AnyData)),
        };
        resolved.push((id, t));
    }
    for (id, t) in resolved {
        match &mut schema.defs[id.0 as usize].kind {
            DefKind::Leaf(l) | DefKind::LeafList(l) => l.typ = Some(t),
            DefKind::AnyXml(a) => a.typ = Some(t),
            _ => {}
        }
    }
    Ok(())
}

/// Collapse a declared type through its typedef chain to a terminal
/// format, merging outer restrictions over the base.
fn resolve_spec(schema: &Schema, scope: DefId, spec: &TypeSpec, as_list: bool) -> Result<Rc<Type>> {
    let mut t = if let Some(format) = spec.builtin_format() {
        let mut t = Type::new(spec.ident.clone(), format);
        t.enumeration = assign_enum_ids(&spec.enumeration);
        for member in &spec.union {
            t.union.push(resolve_spec(schema, scope, member, false)?);
        }
        t
    } else {
        let td = find_typedef(schema, scope, &spec.ident)?;
        let base_spec = match &schema.defs[td.0 as usize].kind {
            DefKind::Typedef(t) => t.spec.clone(),
            _ => unreachable!(),
        };
        // resolve the base in the typedef's own scope
        let base = resolve_spec(schema, td, &base_spec, false)?;
        let mut t = (*base).clone();
        t.ident = spec.ident.clone();
        if !spec.enumeration.is_empty() {
            t.enumeration = assign_enum_ids(&spec.enumeration);
        }
        t
    };

    if spec.range.is_some() {
        t.range = spec.range.clone();
    }
    if spec.length.is_some() {
        t.length = spec.length.clone();
    }
    if !spec.patterns.is_empty() {
        t.patterns = spec.patterns.clone();
    }
    if spec.leafref_path.is_some() {
        t.leafref_path = spec.leafref_path.clone();
    }
    if spec.identity_base.is_some() {
        t.identity_base = spec.identity_base.clone();
    }
    if spec.default_value.is_some() {
        t.default_value = spec.default_value.clone();
    }
    if spec.units.is_some() {
        t.units = spec.units.clone();
    }
    if as_list {
        t.format = t.format.list_of();
    }
    Ok(Rc::new(t))
}

fn assign_enum_ids(labels: &[(String, Option<i64>)]) -> Vec<EnumEntry> {
    let mut entries = Vec::with_capacity(labels.len());
    let mut next = 0i64;
    for (label, explicit) in labels {
        let id = explicit.unwrap_or(next);
        entries.push(EnumEntry {
            label: label.clone(),
            id,
        });
        next = id + 1;
    }
    entries
}

fn find_typedef(schema: &Schema, from: DefId, name: &str) -> Result<DefId> {
    let mut at = Some(from);
    while let Some(p) = at {
        let typedefs: &[DefId] = match &schema.defs[p.0 as usize].kind {
            DefKind::Module(m) => &m.typedefs,
            DefKind::Container(c) => &c.typedefs,
            DefKind::List(l) => &l.typedefs,
            _ => &[],
        };
        for &td in typedefs {
            if schema.ident(td) == name {
                return Ok(td);
            }
        }
        at = schema.parent(p);
    }
    Err(TrellisError::DefNotFound {
        ident: name.to_string(),
        container: "typedefs in scope".to_string(),
    })
}

fn resolve_list_keys(schema: &mut Schema) -> Result<()> {
    let count = schema.defs.len();
    for i in 0..count {
        let id = DefId(i as u32);
        let key_idents = match &schema.defs[i].kind {
            DefKind::List(l) if l.keys.is_empty() && !l.key_idents.is_empty() => {
                l.key_idents.clone()
            }
            _ => continue,
        };
        let mut keys = Vec::with_capacity(key_idents.len());
        for k in &key_idents {
            let leaf = schema.require_ident(id, k)?;
            if !schema.is_leaf(leaf) {
                return Err(TrellisError::Internal {
                    message: format!(
                        "list {} key {} is not a leaf",
                        schema.ident(id),
                        k
                    ),
                });
            }
            keys.push(leaf);
        }
        if let DefKind::List(l) = &mut schema.defs[i].kind {
            l.keys = keys;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::meta::builder::ModuleBuilder;
    use crate::meta::types::TypeSpec;
    use crate::meta::Refine;
    use trellis_core_types::Format;

    #[test]
    fn test_typedef_chain_collapse() {
        let schema = ModuleBuilder::new("m")
            .typedef("metric", TypeSpec::new("int32").units("ms"))
            .typedef("latency", TypeSpec::new("metric").range("0..5000"))
            .leaf("rtt", TypeSpec::new("latency"))
            .finalize()
            .unwrap();
        let rtt = schema.find_by_path(schema.root(), "rtt").unwrap();
        let t = schema.leaf_type(rtt).unwrap();
        assert_eq!(t.format, Format::Int32);
        assert_eq!(t.range.as_deref(), Some("0..5000"));
        assert_eq!(t.units.as_deref(), Some("ms"));
    }

    #[test]
    fn test_enum_id_assignment() {
        let schema = ModuleBuilder::new("m")
            .leaf(
                "state",
                TypeSpec::new("enumeration")
                    .enum_label("idle")
                    .enum_value("busy", 10)
                    .enum_label("stuck"),
            )
            .finalize()
            .unwrap();
        let leaf = schema.find_by_path(schema.root(), "state").unwrap();
        let t = schema.leaf_type(leaf).unwrap();
        let ids: Vec<i64> = t.enumeration.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 10, 11]);
    }

    #[test]
    fn test_uses_expansion_with_refine() {
        let schema = ModuleBuilder::new("m")
            .grouping("endpoint", |g| {
                g.leaf("host", TypeSpec::new("string"))
                    .leaf("port", TypeSpec::new("uint16"))
            })
            .container("server", |c| {
                c.uses_refined(
                    "endpoint",
                    vec![Refine {
                        target: "port".to_string(),
                        default_value: Some("8080".to_string()),
                        ..Default::default()
                    }],
                )
            })
            .finalize()
            .unwrap();
        let port = schema.find_by_path(schema.root(), "server/port").unwrap();
        assert_eq!(schema.default_for(port), Some("8080"));
        // the grouping original is untouched
        assert!(schema.find_by_path(schema.root(), "server/host").is_some());
    }

    #[test]
    fn test_recursive_grouping_marked() {
        let schema = ModuleBuilder::new("m")
            .grouping("tree", |g| {
                g.leaf("name", TypeSpec::new("string"))
                    .container("branch", |b| b.uses("tree"))
            })
            .container("root", |c| c.uses("tree"))
            .finalize()
            .unwrap();

        let branch = schema.find_by_path(schema.root(), "root/branch").unwrap();
        assert!(schema.is_recursive(branch));
        // recursion shares the outer expansion: data depth drives how far
        // navigation goes
        let deeper = schema
            .find_by_path(schema.root(), "root/branch/name")
            .unwrap();
        assert_eq!(schema.ident(deeper), "name");
    }

    #[test]
    fn test_augment_splice_carries_when() {
        let schema = ModuleBuilder::new("m")
            .container("a", |c| c.leaf("x", TypeSpec::new("string")))
            .augment("a", Some("../enabled"), |b| {
                b.leaf("y", TypeSpec::new("string"))
            })
            .finalize()
            .unwrap();
        let y = schema.find_by_path(schema.root(), "a/y").unwrap();
        assert_eq!(schema.when(y), Some("../enabled"));
    }
}
