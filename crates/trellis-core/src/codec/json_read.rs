//! JSON reader node
//!
//! Decodes a payload once, then lazily materializes children as the
//! engine requests them: `child` peeks for the named member, `next`
//! iterates array elements, `field` coerces the scalar at the member.
//! Schema fields absent from the payload read as absent; writes are
//! refused.

use std::io;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::errors::{Result, TrellisError};
use crate::node::{ChildRequest, FieldRequest, ListRequest, Node, Selection, ValueHandle};
use crate::meta::DefId;
use trellis_core_types::Value;

/// Entry points producing a read-only `Node` over a JSON payload
pub struct JsonReader;

impl JsonReader {
    pub fn from_reader(r: impl io::Read) -> Result<Rc<dyn Node>> {
        let doc: Json = serde_json::from_reader(r)?;
        Ok(JsonReader::node(doc))
    }

    pub fn from_str(s: &str) -> Result<Rc<dyn Node>> {
        let doc: Json = serde_json::from_str(s)?;
        Ok(JsonReader::node(doc))
    }

    pub fn node(doc: Json) -> Rc<dyn Node> {
        Rc::new(JsonReadNode {
            doc: Rc::new(doc),
            anchor: Vec::new(),
        })
    }
}

#[derive(Debug, Clone)]
enum Step {
    Member(String),
    Item(usize),
}

struct JsonReadNode {
    doc: Rc<Json>,
    anchor: Vec<Step>,
}

impl JsonReadNode {
    fn at(&self, step: Step) -> Rc<JsonReadNode> {
        let mut anchor = self.anchor.clone();
        anchor.push(step);
        Rc::new(JsonReadNode {
            doc: Rc::clone(&self.doc),
            anchor,
        })
    }

    fn resolve(&self) -> Option<&Json> {
        let mut at: &Json = &self.doc;
        for step in &self.anchor {
            at = match step {
                Step::Member(m) => at.get(m.as_str())?,
                Step::Item(i) => at.get(*i)?,
            };
        }
        Some(at)
    }

    fn read_only(&self, sel: &Selection, meta: DefId) -> TrellisError {
        TrellisError::Forbidden {
            reason: format!("reader is read-only, cannot write {}", sel.schema().ident(meta)),
        }
    }

    fn item_key(sel: &Selection, list: DefId, item: &Json) -> Result<Vec<Value>> {
        let schema = sel.schema();
        let mut key = Vec::new();
        for &leaf in schema.key_meta(list) {
            let Some(raw) = item.get(schema.ident(leaf)) else {
                return Ok(Vec::new());
            };
            let typ = schema
                .leaf_type(leaf)
                .ok_or_else(|| TrellisError::Internal {
                    message: format!("unresolved key type on {}", schema.ident(list)),
                })?;
            key.push(Value::coerce(typ, raw)?);
        }
        Ok(key)
    }
}

impl Node for JsonReadNode {
    fn child(&self, r: &ChildRequest) -> Result<Option<Rc<dyn Node>>> {
        if r.new || r.delete {
            return Err(self.read_only(&r.sel, r.meta));
        }
        let ident = r.sel.schema().ident(r.meta).to_string();
        let present = self
            .resolve()
            .map(|v| v.get(&ident).is_some())
            .unwrap_or(false);
        Ok(present.then(|| self.at(Step::Member(ident)) as Rc<dyn Node>))
    }

    fn next(&self, r: &ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> {
        if r.new || r.delete {
            return Err(self.read_only(&r.sel, r.meta));
        }
        let items_len = match self.resolve() {
            Some(Json::Array(items)) => items.len(),
            _ => return Ok(None),
        };
        if !r.key.is_empty() {
            for i in 0..items_len {
                let item = self.resolve().and_then(|v| v.get(i)).cloned();
                let Some(item) = item else { break };
                let key = Self::item_key(&r.sel, r.meta, &item)?;
                if key.len() == r.key.len() && key.iter().zip(&r.key).all(|(a, b)| a.equal(b)) {
                    return Ok(Some((self.at(Step::Item(i)), key)));
                }
            }
            return Ok(None);
        }
        let idx = usize::try_from(r.row).unwrap_or(usize::MAX);
        if idx >= items_len {
            return Ok(None);
        }
        let item = self.resolve().and_then(|v| v.get(idx)).cloned();
        let Some(item) = item else {
            return Ok(None);
        };
        let key = Self::item_key(&r.sel, r.meta, &item)?;
        Ok(Some((self.at(Step::Item(idx)), key)))
    }

    fn field(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<()> {
        if r.write {
            return Err(self.read_only(&r.sel, r.meta));
        }
        let schema = r.sel.schema();
        let ident = schema.ident(r.meta);
        let raw = self.resolve().and_then(|v| v.get(ident)).cloned();
        if let Some(raw) = raw {
            if !raw.is_null() {
                let typ = schema
                    .leaf_type(r.meta)
                    .ok_or_else(|| TrellisError::NotLeaf {
                        ident: ident.to_string(),
                    })?;
                hnd.val = Some(Value::coerce(typ, &raw)?);
            }
        }
        Ok(())
    }
}
