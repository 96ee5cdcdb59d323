//! Garage demo: a small managed service built on the browsing engine.
//!
//! A schema models a car, a JSON document backs the live data, and the
//! engine serves reads, targeted edits, and an rpc through the same
//! `Selection` surface a RESTCONF transport would use.
//!
//! Run with: cargo run --example garage

use std::rc::Rc;

use serde_json::json;
use trellis_core::errors::Result;
use trellis_core::logging_facility::{init, Profile};
use trellis_core::node::Node;
use trellis_core::{
    BasicNode, Browser, JsonContainer, JsonReader, JsonWriter, ModuleBuilder, SharedBuffer,
    TypeSpec,
};

fn car_schema() -> Rc<trellis_core::Schema> {
    ModuleBuilder::new("car")
        .namespace("urn:demo:car")
        .prefix("car")
        .container("engine", |e| {
            e.leaf("running", TypeSpec::new("boolean").default_value("false"))
                .leaf("rpm", TypeSpec::new("int32"))
        })
        .list("tires", &["pos"], |t| {
            t.leaf("pos", TypeSpec::new("string"))
                .leaf("wear", TypeSpec::new("decimal64"))
        })
        .rpc("rotate-tires", |r| {
            r.output(|o| o.leaf("rotated", TypeSpec::new("int32")))
        })
        .finalize()
        .expect("car schema builds")
}

/// Wrap the plain data document with an rpc implementation
fn car_node(data: Rc<JsonContainer>) -> Rc<dyn Node> {
    let doc = data.document();
    let base = Rc::clone(&data) as Rc<dyn Node>;
    let child_base = Rc::clone(&base);
    BasicNode::new()
        .on_child(move |r| {
            if r.sel.schema().ident(r.meta) == "rotate-tires" {
                let doc = Rc::clone(&doc);
                let action = BasicNode::new()
                    .on_action(move |_r| {
                        let mut rotated = 0;
                        if let Some(tires) = doc.borrow_mut().get_mut("tires") {
                            if let Some(items) = tires.as_array_mut() {
                                let len = items.len();
                                items.rotate_left(1.min(len));
                                rotated = items.len();
                            }
                        }
                        let out = JsonContainer::new(json!({ "rotated": rotated }));
                        Ok(Some(out as Rc<dyn Node>))
                    })
                    .into_node();
                return Ok(Some(action));
            }
            child_base.child(r)
        })
        .into_node()
}

fn main() -> Result<()> {
    init(Profile::Development);

    let data = JsonContainer::new(json!({
        "engine": { "rpm": 1200 },
        "tires": [
            {"pos": "fl", "wear": 0.2},
            {"pos": "fr", "wear": 0.3},
            {"pos": "rl", "wear": 0.25},
            {"pos": "rr", "wear": 0.25}
        ]
    }));
    let browser = Browser::new(car_schema(), car_node(Rc::clone(&data)));

    // read the whole tree the way a GET would
    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser.root().insert_into(writer.node()).or_err()?;
    println!("car: {}", buf.string());

    // targeted read with constraints
    let buf = SharedBuffer::new();
    let writer = JsonWriter::new(buf.clone());
    browser
        .root()
        .find_url("?fields=engine")
        .insert_into(writer.node())
        .or_err()?;
    println!("engine only: {}", buf.string());

    // patch one leaf the way a PUT would
    browser
        .root()
        .upsert_from(JsonReader::from_str(r#"{"engine":{"running":true}}"#)?)
        .or_err()?;
    println!("running: {:?}", browser.root().find("engine").get("running")?);

    // invoke the rpc
    let out = browser.root().find("rotate-tires").or_err()?.action(None)?;
    if let Some(out) = out {
        println!("rotated: {:?}", out.get("rotated")?);
    }

    Ok(())
}
