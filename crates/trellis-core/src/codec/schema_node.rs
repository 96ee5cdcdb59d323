//! Schema self-browsing
//!
//! Exposes a schema's own definition tree as data through the `Node`
//! contract, so a module can be walked and serialized with the same
//! engine that serves its data (e.g. served to management clients as
//! JSON). Read-only; schema construction belongs to the parser.
//!
//! The meta-schema below is itself recursive (definitions contain
//! definitions), which exercises the engine's recursion handling: the
//! walked schema's depth bounds the traversal.

use std::rc::Rc;

use serde_json::json;

use crate::errors::Result;
use crate::meta::builder::ModuleBuilder;
use crate::meta::types::TypeSpec;
use crate::meta::{DefId, DefKind, Schema};
use crate::node::{BasicNode, Browser, FieldRequest, Node, ValueHandle};
use trellis_core_types::Value;

/// Browser over the definition tree of `schema`
pub fn schema_browser(schema: &Rc<Schema>) -> Rc<Browser> {
    let meta = meta_schema();
    Browser::new(meta, module_node(Rc::clone(schema)))
}

/// The schema of schemas: what a module's definition tree looks like
/// when browsed as data
fn meta_schema() -> Rc<Schema> {
    ModuleBuilder::new("meta")
        .namespace("urn:trellis:meta")
        .prefix("meta")
        .grouping("type-block", |g| {
            g.container("type", |t| {
                t.leaf("ident", TypeSpec::new("string"))
                    .leaf_list("enumeration", TypeSpec::new("string"))
                    .leaf("default", TypeSpec::new("string"))
                    .leaf("units", TypeSpec::new("string"))
            })
        })
        .grouping("def-header", |g| {
            g.leaf("ident", TypeSpec::new("string"))
                .leaf("description", TypeSpec::new("string"))
                .leaf("config", TypeSpec::new("boolean"))
                .leaf("mandatory", TypeSpec::new("boolean"))
        })
        .grouping("def-body", |g| {
            g.list("definitions", &["ident"], |l| {
                l.leaf("ident", TypeSpec::new("string"))
                    .choice("body-stmt", |ch| {
                        ch.case("container", |c| {
                            c.container("container", |b| b.uses("def-header").uses("def-body"))
                        })
                        .case("list", |c| {
                            c.container("list", |b| {
                                b.leaf_list("key", TypeSpec::new("string"))
                                    .uses("def-header")
                                    .uses("def-body")
                            })
                        })
                        .case("leaf", |c| {
                            c.container("leaf", |b| b.uses("def-header").uses("type-block"))
                        })
                        .case("leaf-list", |c| {
                            c.container("leaf-list", |b| b.uses("def-header").uses("type-block"))
                        })
                        .case("anyxml", |c| {
                            c.container("anyxml", |b| b.uses("def-header"))
                        })
                        .case("choice", |c| {
                            c.container("choice", |b| {
                                b.leaf("ident", TypeSpec::new("string")).list(
                                    "cases",
                                    &["ident"],
                                    |cs| {
                                        cs.leaf("ident", TypeSpec::new("string")).uses("def-body")
                                    },
                                )
                            })
                        })
                        .case("notification", |c| {
                            c.container("notification", |b| b.uses("def-header").uses("def-body"))
                        })
                        .case("action", |c| {
                            c.container("action", |b| {
                                b.uses("def-header")
                                    .container("input", |i| i.uses("def-body"))
                                    .container("output", |o| o.uses("def-body"))
                            })
                        })
                    })
            })
        })
        .container("module", |m| {
            m.leaf("namespace", TypeSpec::new("string"))
                .leaf("prefix", TypeSpec::new("string"))
                .leaf("revision", TypeSpec::new("string"))
                .uses("def-header")
                .uses("def-body")
        })
        .finalize()
        .expect("meta schema must build")
}

fn read_json(r: &FieldRequest, hnd: &mut ValueHandle, raw: serde_json::Value) -> Result<()> {
    if let Some(typ) = r.sel.schema().leaf_type(r.meta) {
        hnd.val = Some(Value::coerce(typ, &raw)?);
    }
    Ok(())
}

/// Common header fields shared by every definition kind
fn header_field(schema: &Rc<Schema>, def: DefId, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<()> {
    match r.sel.schema().ident(r.meta) {
        "ident" => read_json(r, hnd, json!(schema.ident(def)))?,
        "description" => {
            if let Some(d) = schema.description(def) {
                read_json(r, hnd, json!(d))?;
            }
        }
        "config" => {
            if let Some(details) = schema.details(def) {
                if let Some(c) = details.config {
                    read_json(r, hnd, json!(c))?;
                }
            }
        }
        "mandatory" => {
            if let Some(details) = schema.details(def) {
                if let Some(m) = details.mandatory {
                    read_json(r, hnd, json!(m))?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn module_node(schema: Rc<Schema>) -> Rc<dyn Node> {
    BasicNode::new()
        .on_child(move |r| {
            if r.sel.schema().ident(r.meta) == "module" {
                return Ok(Some(module_body(Rc::clone(&schema))));
            }
            Ok(None)
        })
        .into_node()
}

fn module_body(schema: Rc<Schema>) -> Rc<dyn Node> {
    let root = schema.root();
    let field_schema = Rc::clone(&schema);
    let child_schema = Rc::clone(&schema);
    BasicNode::new()
        .on_field(move |r, hnd| {
            let module = match &field_schema.def(root).kind {
                DefKind::Module(m) => m,
                _ => return Ok(()),
            };
            match r.sel.schema().ident(r.meta) {
                "namespace" if !module.namespace.is_empty() => {
                    read_json(r, hnd, json!(module.namespace))
                }
                "prefix" if !module.prefix.is_empty() => read_json(r, hnd, json!(module.prefix)),
                "revision" => match &module.revision {
                    Some(rev) => read_json(r, hnd, json!(rev.ident)),
                    None => Ok(()),
                },
                _ => header_field(&field_schema, root, r, hnd),
            }
        })
        .on_child(move |r| {
            if r.sel.schema().ident(r.meta) == "definitions" {
                let defs = child_schema.data_definitions(root);
                if !defs.is_empty() {
                    return Ok(Some(definitions_node(
                        Rc::clone(&child_schema),
                        defs,
                        definition_node,
                    )));
                }
            }
            Ok(None)
        })
        .into_node()
}

fn definitions_node(
    schema: Rc<Schema>,
    defs: Vec<DefId>,
    item: fn(Rc<Schema>, DefId) -> Rc<dyn Node>,
) -> Rc<dyn Node> {
    BasicNode::new()
        .on_next(move |r| {
            let pick = if !r.key.is_empty() {
                let want = r.key[0].to_string();
                defs.iter().copied().find(|&d| schema.ident(d) == want)
            } else {
                usize::try_from(r.row).ok().and_then(|i| defs.get(i).copied())
            };
            let Some(def) = pick else {
                return Ok(None);
            };
            let key_typ = r
                .sel
                .schema()
                .leaf_type(r.sel.schema().key_meta(r.meta)[0])
                .cloned()
                .expect("definitions key is a string leaf");
            let key = vec![Value::coerce(&key_typ, &json!(schema.ident(def)))?];
            Ok(Some((item(Rc::clone(&schema), def), key)))
        })
        .into_node()
}

/// One case of a browsed choice: header plus nested definitions
fn case_node(schema: Rc<Schema>, case: DefId) -> Rc<dyn Node> {
    let child_schema = Rc::clone(&schema);
    let field_schema = Rc::clone(&schema);
    BasicNode::new()
        .on_child(move |r| {
            if r.sel.schema().ident(r.meta) == "definitions" {
                let defs = child_schema.data_definitions(case);
                if !defs.is_empty() {
                    return Ok(Some(definitions_node(
                        Rc::clone(&child_schema),
                        defs,
                        definition_node,
                    )));
                }
            }
            Ok(None)
        })
        .on_field(move |r, hnd| header_field(&field_schema, case, r, hnd))
        .into_node()
}

/// Discriminating name used to pick the body-stmt case
fn kind_name(schema: &Schema, def: DefId) -> &'static str {
    match &schema.def(def).kind {
        DefKind::List(_) => "list",
        DefKind::Leaf(_) => "leaf",
        DefKind::LeafList(_) => "leaf-list",
        DefKind::AnyXml(_) => "anyxml",
        DefKind::Choice { .. } => "choice",
        DefKind::Notification { .. } => "notification",
        DefKind::Rpc(_) => "action",
        _ => "container",
    }
}

fn definition_node(schema: Rc<Schema>, def: DefId) -> Rc<dyn Node> {
    let choose_schema = Rc::clone(&schema);
    let child_schema = Rc::clone(&schema);
    let field_schema = Rc::clone(&schema);
    BasicNode::new()
        .on_choose(move |sel, choice| {
            let want = kind_name(&choose_schema, def);
            let case = sel
                .schema()
                .choice_cases(choice)
                .iter()
                .copied()
                .find(|&c| sel.schema().ident(c) == want);
            Ok(case)
        })
        .on_child(move |r| {
            let ident = r.sel.schema().ident(r.meta);
            if ident != kind_name(&child_schema, def) {
                return Ok(None);
            }
            Ok(Some(body_node(Rc::clone(&child_schema), def)))
        })
        .on_field(move |r, hnd| header_field(&field_schema, def, r, hnd))
        .into_node()
}

/// Kind-specific body of one definition
fn body_node(schema: Rc<Schema>, def: DefId) -> Rc<dyn Node> {
    let child_schema = Rc::clone(&schema);
    let field_schema = Rc::clone(&schema);
    BasicNode::new()
        .on_child(move |r| {
            let ident = r.sel.schema().ident(r.meta);
            match ident {
                "definitions" => {
                    let defs = child_schema.data_definitions(def);
                    if defs.is_empty() {
                        return Ok(None);
                    }
                    Ok(Some(definitions_node(
                        Rc::clone(&child_schema),
                        defs,
                        definition_node,
                    )))
                }
                "type" => match child_schema.leaf_type(def) {
                    Some(t) => Ok(Some(type_node(Rc::clone(t)))),
                    None => Ok(None),
                },
                "cases" => {
                    let cases = child_schema.choice_cases(def).to_vec();
                    if cases.is_empty() {
                        return Ok(None);
                    }
                    Ok(Some(definitions_node(
                        Rc::clone(&child_schema),
                        cases,
                        case_node,
                    )))
                }
                "input" => match child_schema.rpc(def).and_then(|rpc| rpc.input) {
                    Some(input) => Ok(Some(body_node(Rc::clone(&child_schema), input))),
                    None => Ok(None),
                },
                "output" => match child_schema.rpc(def).and_then(|rpc| rpc.output) {
                    Some(output) => Ok(Some(body_node(Rc::clone(&child_schema), output))),
                    None => Ok(None),
                },
                _ => Ok(None),
            }
        })
        .on_field(move |r, hnd| {
            if r.sel.schema().ident(r.meta) == "key" {
                let keys: Vec<&str> = field_schema
                    .key_meta(def)
                    .iter()
                    .map(|&k| field_schema.ident(k))
                    .collect();
                if keys.is_empty() {
                    return Ok(());
                }
                return read_json(r, hnd, json!(keys));
            }
            header_field(&field_schema, def, r, hnd)
        })
        .into_node()
}

fn type_node(typ: Rc<trellis_core_types::Type>) -> Rc<dyn Node> {
    BasicNode::new()
        .on_field(move |r, hnd| {
            match r.sel.schema().ident(r.meta) {
                "ident" => read_json(r, hnd, json!(typ.ident))?,
                "enumeration" => {
                    if !typ.enumeration.is_empty() {
                        let labels: Vec<&str> =
                            typ.enumeration.iter().map(|e| e.label.as_str()).collect();
                        read_json(r, hnd, json!(labels))?;
                    }
                }
                "default" => {
                    if let Some(d) = &typ.default_value {
                        read_json(r, hnd, json!(d))?;
                    }
                }
                "units" => {
                    if let Some(u) = &typ.units {
                        read_json(r, hnd, json!(u))?;
                    }
                }
                _ => {}
            }
            Ok(())
        })
        .into_node()
}
