use std::rc::Rc;

use trellis_core::{ModuleBuilder, Schema, TypeSpec};

/// Module with a nested container and a keyed list:
///
/// ```text
/// container a { container b { leaf x string; } }
/// list p { key "k"; leaf k string; container q { leaf s string; }
///          list r { leaf z int32; } }
/// ```
#[allow(dead_code)]
pub fn collection_module() -> Rc<Schema> {
    ModuleBuilder::new("m")
        .container("a", |c| {
            c.container("b", |b| b.leaf("x", TypeSpec::new("string")))
        })
        .list("p", &["k"], |l| {
            l.leaf("k", TypeSpec::new("string"))
                .container("q", |q| q.leaf("s", TypeSpec::new("string")))
                .list("r", &[], |r| r.leaf("z", TypeSpec::new("int32")))
        })
        .finalize()
        .unwrap()
}

/// Game module exercising leaf-lists and list nesting
#[allow(dead_code)]
pub fn game_module() -> Rc<Schema> {
    ModuleBuilder::new("rts")
        .namespace("urn:test:rts")
        .prefix("rts")
        .container("game", |g| {
            g.leaf("base-radius", TypeSpec::new("int32"))
                .list("teams", &["color"], |t| {
                    t.leaf("color", TypeSpec::new("string"))
                        .container("team", |tm| {
                            tm.leaf_list("members", TypeSpec::new("string"))
                        })
                })
        })
        .finalize()
        .unwrap()
}

/// Module for content (config/state) filtering:
///
/// ```text
/// container y { config false; leaf a string; }
/// container z { leaf a string; }
/// ```
#[allow(dead_code)]
pub fn content_module() -> Rc<Schema> {
    ModuleBuilder::new("m")
        .container_cfg("y", Some(false), |c| c.leaf("a", TypeSpec::new("string")))
        .container("z", |c| c.leaf("a", TypeSpec::new("string")))
        .finalize()
        .unwrap()
}

/// Module with a choice between two transport cases
#[allow(dead_code)]
pub fn choice_module() -> Rc<Schema> {
    ModuleBuilder::new("m")
        .container("conn", |c| {
            c.choice("transport", |ch| {
                ch.case("tcp", |t| t.leaf("port", TypeSpec::new("uint16")))
                    .case("tls", |t| t.leaf("cert", TypeSpec::new("string")))
            })
        })
        .finalize()
        .unwrap()
}

/// Module with a defaulted leaf for with-defaults testing
#[allow(dead_code)]
pub fn defaults_module() -> Rc<Schema> {
    ModuleBuilder::new("m")
        .container("c", |c| {
            c.leaf("speed", TypeSpec::new("int32").default_value("10"))
                .leaf("name", TypeSpec::new("string"))
        })
        .finalize()
        .unwrap()
}
