//! In-memory read-write provider over a JSON document
//!
//! The reference `Node` implementation: adapts a `serde_json::Value`
//! tree to the schema, resolving its own position through an anchor of
//! member/index steps from the shared document root. Containers project
//! to objects, lists to arrays, leaves to scalars.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value as Json};

use crate::errors::{Result, TrellisError};
use crate::meta::DefId;
use crate::node::{
    ChildRequest, FieldRequest, ListRequest, Node, NodeRequest, Selection, ValueHandle,
};
use trellis_core_types::Value;

#[derive(Debug, Clone)]
enum Step {
    Member(String),
    Item(usize),
}

/// Read-write node over a shared JSON document
pub struct JsonContainer {
    root: Rc<RefCell<Json>>,
    anchor: Vec<Step>,
}

impl JsonContainer {
    /// Wrap a document; the returned node is its root
    pub fn new(initial: Json) -> Rc<JsonContainer> {
        Rc::new(JsonContainer {
            root: Rc::new(RefCell::new(initial)),
            anchor: Vec::new(),
        })
    }

    /// Share an existing document cell
    pub fn share(root: Rc<RefCell<Json>>) -> Rc<JsonContainer> {
        Rc::new(JsonContainer {
            root,
            anchor: Vec::new(),
        })
    }

    /// Snapshot of the whole backing document
    pub fn value(&self) -> Json {
        self.root.borrow().clone()
    }

    /// Shared handle to the backing document
    pub fn document(&self) -> Rc<RefCell<Json>> {
        Rc::clone(&self.root)
    }

    fn at(&self, step: Step) -> Rc<JsonContainer> {
        let mut anchor = self.anchor.clone();
        anchor.push(step);
        Rc::new(JsonContainer {
            root: Rc::clone(&self.root),
            anchor,
        })
    }

    fn read<R>(&self, f: impl FnOnce(Option<&Json>) -> R) -> R {
        let doc = self.root.borrow();
        f(resolve(&doc, &self.anchor))
    }

    fn write<R>(&self, f: impl FnOnce(Option<&mut Json>) -> R) -> R {
        let mut doc = self.root.borrow_mut();
        f(resolve_mut(&mut doc, &self.anchor))
    }

    /// Key values of one list item, read back through the key leaf types
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

    fn key_matches(sel: &Selection, list: DefId, item: &Json, key: &[Value]) -> Result<bool> {
        let item_key = Self::item_key(sel, list, item)?;
        Ok(item_key.len() == key.len() && item_key.iter().zip(key).all(|(a, b)| a.equal(b)))
    }
}

fn resolve<'a>(v: &'a Json, anchor: &[Step]) -> Option<&'a Json> {
    let mut at = v;
    for step in anchor {
        at = match step {
            Step::Member(m) => at.get(m.as_str())?,
            Step::Item(i) => at.get(*i)?,
        };
    }
    Some(at)
}

fn resolve_mut<'a>(v: &'a mut Json, anchor: &[Step]) -> Option<&'a mut Json> {
    let mut at = v;
    for step in anchor {
        at = match step {
            Step::Member(m) => at.get_mut(m.as_str())?,
            Step::Item(i) => at.get_mut(*i)?,
        };
    }
    Some(at)
}

impl Node for JsonContainer {
    fn child(&self, r: &ChildRequest) -> Result<Option<Rc<dyn Node>>> {
        let schema = r.sel.schema();
        let ident = schema.ident(r.meta).to_string();

        if r.delete {
            self.write(|v| {
                if let Some(Json::Object(map)) = v {
                    map.remove(&ident);
                }
            });
            return Ok(None);
        }

        let present = self.read(|v| matches!(v, Some(j) if j.get(&ident).is_some()));
        if present {
            return Ok(Some(self.at(Step::Member(ident))));
        }
        if !r.new {
            return Ok(None);
        }

        let empty = if schema.is_list(r.meta) {
            json!([])
        } else {
            json!({})
        };
        let created = self.write(|v| match v {
            Some(Json::Object(map)) => {
                map.insert(ident.clone(), empty);
                true
            }
            _ => false,
        });
        if !created {
            return Err(TrellisError::Internal {
                message: format!("cannot create {} outside an object", ident),
            });
        }
        Ok(Some(self.at(Step::Member(ident))))
    }

    fn next(&self, r: &ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> {
        let sel = &r.sel;

        if r.delete {
            let mut err = None;
            self.write(|v| {
                if let Some(Json::Array(items)) = v {
                    let mut filtered = Vec::with_capacity(items.len());
                    for item in items.drain(..) {
                        match Self::key_matches(sel, r.meta, &item, &r.key) {
                            Ok(true) => {}
                            Ok(false) => filtered.push(item),
                            Err(e) => err = Some(e),
                        }
                    }
                    *items = filtered;
                }
            });
            if let Some(e) = err {
                return Err(e);
            }
            return Ok(None);
        }

        if r.new {
            let mut item = serde_json::Map::new();
            let key_meta = sel.schema().key_meta(r.meta).to_vec();
            for (leaf, v) in key_meta.iter().zip(&r.key) {
                item.insert(sel.schema().ident(*leaf).to_string(), v.to_json());
            }
            let idx = self.write(|v| match v {
                Some(Json::Array(items)) => {
                    items.push(Json::Object(item));
                    Some(items.len() - 1)
                }
                _ => None,
            });
            let Some(idx) = idx else {
                return Err(TrellisError::Internal {
                    message: "cannot append outside an array".to_string(),
                });
            };
            return Ok(Some((self.at(Step::Item(idx)), r.key.clone())));
        }

        if !r.key.is_empty() {
            // key-scan
            let found = {
                let doc = self.root.borrow();
                match resolve(&doc, &self.anchor) {
                    Some(Json::Array(items)) => {
                        let mut found = None;
                        for (i, item) in items.iter().enumerate() {
                            if Self::key_matches(sel, r.meta, item, &r.key)? {
                                found = Some(i);
                                break;
                            }
                        }
                        found
                    }
                    _ => None,
                }
            };
            return Ok(found.map(|i| {
                (
                    self.at(Step::Item(i)) as Rc<dyn Node>,
                    r.key.clone(),
                )
            }));
        }

        // row-scan
        let idx = usize::try_from(r.row).unwrap_or(usize::MAX);
        let item = self.read(|v| match v {
            Some(Json::Array(items)) => items.get(idx).cloned(),
            _ => None,
        });
        match item {
            Some(item) => {
                let key = Self::item_key(sel, r.meta, &item)?;
                Ok(Some((self.at(Step::Item(idx)), key)))
            }
            None => Ok(None),
        }
    }

    fn field(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<()> {
        let schema = r.sel.schema();
        let ident = schema.ident(r.meta).to_string();
        if r.write {
            let Some(v) = hnd.val.take() else {
                return Ok(());
            };
            let wire = v.to_json();
            let ok = self.write(|j| match j {
                Some(Json::Object(map)) => {
                    map.insert(ident.clone(), wire);
                    true
                }
                _ => false,
            });
            if !ok {
                return Err(TrellisError::Internal {
                    message: format!("cannot write {} outside an object", ident),
                });
            }
            return Ok(());
        }
        let raw = self.read(|j| j.and_then(|j| j.get(&ident)).cloned());
        if let Some(raw) = raw {
            if !raw.is_null() {
                let typ = schema
                    .leaf_type(r.meta)
                    .ok_or_else(|| TrellisError::NotLeaf {
                        ident: ident.clone(),
                    })?;
                hnd.val = Some(Value::coerce(typ, &raw)?);
            }
        }
        Ok(())
    }

    fn peek(&self, _sel: &Selection) -> Option<Rc<dyn Any>> {
        Some(Rc::new(self.value()))
    }

    fn delete(&self, _r: &NodeRequest) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::builder::ModuleBuilder;
    use crate::meta::types::TypeSpec;
    use crate::node::Browser;

    fn sample() -> Rc<crate::meta::Schema> {
        ModuleBuilder::new("m")
            .container("a", |c| {
                c.container("b", |b| b.leaf("x", TypeSpec::new("string")))
            })
            .list("p", &["k"], |l| l.leaf("k", TypeSpec::new("string")))
            .finalize()
            .unwrap()
    }

    #[test]
    fn test_get_set_round_trip() {
        let schema = sample();
        let node = JsonContainer::new(json!({"a": {"b": {"x": "waldo"}}}));
        let browser = Browser::new(schema, node.clone());
        let b = browser.root().find("a/b");
        assert!(b.last_err().is_none());
        let v = b.get("x").unwrap().unwrap();
        assert_eq!(v.to_string(), "waldo");

        b.set("x", &json!("odlaw")).unwrap();
        assert_eq!(node.value()["a"]["b"]["x"], json!("odlaw"));
    }

    #[test]
    fn test_key_scan() {
        let schema = sample();
        let node = JsonContainer::new(json!({"p": [{"k": "walter"}, {"k": "waldo"}]}));
        let browser = Browser::new(schema, node);
        let item = browser.root().find("p=waldo");
        assert!(item.last_err().is_none());
        assert_eq!(item.key()[0].to_string(), "waldo");
    }

    #[test]
    fn test_find_missing_item_is_404() {
        let schema = sample();
        let node = JsonContainer::new(json!({"p": []}));
        let browser = Browser::new(schema, node);
        let item = browser.root().find("p=nobody");
        assert_eq!(item.last_err().unwrap().status(), 404);
    }
}
