mod common;

use common::game_module;
use trellis_core::{schema_browser, JsonWriter, ModuleBuilder, SharedBuffer, TypeSpec};

#[test]
fn test_module_serializes_through_engine() {
    let schema = game_module();
    let browser = schema_browser(&schema);

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .upsert_into(writer.node())
        .or_err()
        .unwrap();

    let out = buf.string();
    assert!(out.contains(r#""ident":"rts""#), "got {}", out);
    assert!(out.contains(r#""namespace":"urn:test:rts""#), "got {}", out);
    assert!(out.contains(r#""ident":"game""#), "got {}", out);
    assert!(out.contains(r#""ident":"teams""#), "got {}", out);
    assert!(out.contains(r#""key":["color"]"#), "got {}", out);
    assert!(out.contains(r#""ident":"int32""#), "got {}", out);
}

#[test]
fn test_definition_addressable_by_key() {
    let schema = game_module();
    let browser = schema_browser(&schema);

    let game = browser.root().find("module/definitions=game");
    assert!(game.last_err().is_none(), "err: {:?}", game.last_err());
    let ident = game.get("ident").unwrap().unwrap();
    assert_eq!(ident.to_string(), "game");
}

#[test]
fn test_browse_depth_is_bounded_by_walked_schema() {
    // deeply nested module exercises the recursive definitions grouping:
    // the walked schema's depth, not the meta-schema, bounds traversal
    let schema = ModuleBuilder::new("deep")
        .container("l1", |c| {
            c.container("l2", |c| {
                c.container("l3", |c| c.leaf("x", TypeSpec::new("string")))
            })
        })
        .finalize()
        .unwrap();
    let browser = schema_browser(&schema);

    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .upsert_into(writer.node())
        .or_err()
        .unwrap();

    let out = buf.string();
    assert!(out.contains(r#""ident":"l3""#), "got {}", out);
    assert!(out.contains(r#""ident":"x""#), "got {}", out);
}

#[test]
fn test_details_surface_when_explicit() {
    let schema = ModuleBuilder::new("m")
        .container_cfg("state", Some(false), |c| c.leaf("a", TypeSpec::new("string")))
        .finalize()
        .unwrap();
    let browser = schema_browser(&schema);

    let def = browser.root().find("module/definitions=state/container");
    assert!(def.last_err().is_none(), "err: {:?}", def.last_err());
    let config = def.get("config").unwrap().unwrap();
    assert_eq!(config.to_string(), "false");
}
