//! Paths into the data tree
//!
//! A `Path` is an immutable cons cell pairing a schema definition with
//! optional list key values, linked to its parent; selections share path
//! tails cheaply through `Rc`. A `PathSlice` marks a (head, tail) range
//! used during targeted walks.
//!
//! URL form: segments separated by `/`, list keys appended as
//! `ident=k1,k2`, everything percent-encoded. `parse(render(p)) == p`
//! for every legal path.

use std::fmt;
use std::rc::Rc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::{Result, TrellisError};
use crate::meta::{DefId, Schema};
use trellis_core_types::Value;

/// Characters escaped when rendering path segments and key values
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'=')
    .add(b',')
    .add(b'?')
    .add(b'&')
    .add(b'#')
    .add(b'%');

/// One position in the data tree: schema definition plus list keys
#[derive(Debug)]
pub struct Path {
    parent: Option<Rc<Path>>,
    meta: DefId,
    key: Vec<Value>,
    schema: Rc<Schema>,
}

impl Path {
    /// Root path of a schema: the module itself, rendered as empty
    pub fn root(schema: Rc<Schema>) -> Rc<Path> {
        let meta = schema.root();
        Path::root_at(schema, meta)
    }

    /// Root path anchored at an arbitrary schema position; used when a
    /// browser is split off mid-tree
    pub fn root_at(schema: Rc<Schema>, meta: DefId) -> Rc<Path> {
        Rc::new(Path {
            parent: None,
            meta,
            key: Vec::new(),
            schema,
        })
    }

    pub fn child(self: &Rc<Path>, meta: DefId) -> Rc<Path> {
        Rc::new(Path {
            parent: Some(Rc::clone(self)),
            meta,
            key: Vec::new(),
            schema: Rc::clone(&self.schema),
        })
    }

    /// Path of a list item: list meta plus key, parented on the list's
    /// parent rather than the list position itself.
    pub fn list_item(parent: &Rc<Path>, meta: DefId, key: Vec<Value>) -> Rc<Path> {
        Rc::new(Path {
            parent: Some(Rc::clone(parent)),
            meta,
            key,
            schema: Rc::clone(&parent.schema),
        })
    }

    pub fn meta(&self) -> DefId {
        self.meta
    }

    pub fn key(&self) -> &[Value] {
        &self.key
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn parent(&self) -> Option<&Rc<Path>> {
        self.parent.as_ref()
    }

    pub fn ident(&self) -> &str {
        self.schema.ident(self.meta)
    }

    /// Depth from the root; the root itself is 0
    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut at = self.parent.as_ref();
        while let Some(p) = at {
            n += 1;
            at = p.parent.as_ref();
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
    }

    /// Segments from root to self, root excluded
    pub fn segments(self: &Rc<Path>) -> Vec<Rc<Path>> {
        let mut segs = Vec::new();
        let mut at = Some(Rc::clone(self));
        while let Some(p) = at {
            if p.parent.is_some() {
                segs.push(Rc::clone(&p));
            }
            at = p.parent.clone();
        }
        segs.reverse();
        segs
    }

    pub fn equal(&self, other: &Path) -> bool {
        if self.meta != other.meta || self.key.len() != other.key.len() {
            return false;
        }
        if !self.key.iter().zip(&other.key).all(|(a, b)| a.equal(b)) {
            return false;
        }
        match (&self.parent, &other.parent) {
            (None, None) => true,
            (Some(a), Some(b)) => a.equal(b),
            _ => false,
        }
    }

    fn write_segment(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", utf8_percent_encode(self.ident(), SEGMENT))?;
        if !self.key.is_empty() {
            write!(f, "=")?;
            for (i, k) in self.key.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", utf8_percent_encode(&k.to_string(), SEGMENT))?;
            }
        }
        Ok(())
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            parent.fmt(f)?;
            self.write_segment(f)?;
        }
        Ok(())
    }
}

/// A (head, tail] range of a path used during targeted walks
#[derive(Debug, Clone)]
pub struct PathSlice {
    pub head: Rc<Path>,
    pub tail: Rc<Path>,
}

impl PathSlice {
    pub fn empty(at: Rc<Path>) -> PathSlice {
        PathSlice {
            head: Rc::clone(&at),
            tail: at,
        }
    }

    pub fn is_empty(&self) -> bool {
        Rc::ptr_eq(&self.head, &self.tail)
    }

    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut at = Rc::clone(&self.tail);
        while !Rc::ptr_eq(&at, &self.head) {
            n += 1;
            let Some(p) = at.parent().cloned() else { break };
            at = p;
        }
        n
    }

    /// Segments between head (exclusive) and tail (inclusive)
    pub fn segments(&self) -> Vec<Rc<Path>> {
        let mut segs = Vec::new();
        let mut at = Rc::clone(&self.tail);
        while !Rc::ptr_eq(&at, &self.head) {
            segs.push(Rc::clone(&at));
            let Some(p) = at.parent().cloned() else { break };
            at = p;
        }
        segs.reverse();
        segs
    }

    pub fn equal(&self, other: &PathSlice) -> bool {
        let a = self.segments();
        let b = other.segments();
        a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x.equal(y))
    }
}

/// Split a URL-ish string into its path and query parts
pub fn split_query(s: &str) -> (&str, Option<&str>) {
    match s.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (s, None),
    }
}

fn decode(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|_| TrellisError::PathSyntax {
            reason: format!("invalid percent-encoding in {}", s),
        })
}

/// Parse the path portion of a URL relative to `base`.
///
/// Each segment is resolved against the schema; list keys are coerced
/// through the list's key leaf types.
///
/// # Errors
/// `DefNotFound` (404) for an unknown identifier; `KeyCountMismatch`
/// (400) when key values disagree with the list's key count;
/// `PathSyntax`/coercion errors (400) for malformed input.
pub fn parse_url_path(base: &Rc<Path>, path: &str) -> Result<PathSlice> {
    let schema = Rc::clone(base.schema());
    let mut slice = PathSlice::empty(Rc::clone(base));
    let mut at = Rc::clone(base);
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        let (ident_raw, keys_raw) = match segment.split_once('=') {
            Some((i, k)) => (i, Some(k)),
            None => (segment, None),
        };
        let ident = decode(ident_raw)?;
        let meta = schema.require_ident(at.meta(), &ident)?;
        let key = match keys_raw {
            Some(raw) => {
                let key_meta = schema.key_meta(meta);
                let parts: Vec<&str> = raw.split(',').collect();
                if parts.len() != key_meta.len() {
                    return Err(TrellisError::KeyCountMismatch {
                        list: ident.clone(),
                        expected: key_meta.len(),
                        got: parts.len(),
                    });
                }
                let mut key = Vec::with_capacity(parts.len());
                for (part, &leaf) in parts.iter().zip(key_meta) {
                    let typ = schema.leaf_type(leaf).ok_or_else(|| TrellisError::Internal {
                        message: format!("unresolved key type on {}", ident),
                    })?;
                    let decoded = decode(part)?;
                    key.push(Value::from_str_form(typ, &decoded)?);
                }
                key
            }
            None => Vec::new(),
        };
        let next = if key.is_empty() {
            at.child(meta)
        } else {
            // a keyed segment addresses the item, parented like one
            Path::list_item(&at, meta, key)
        };
        slice.tail = Rc::clone(&next);
        at = next;
    }
    Ok(slice)
}

/// Decode `k=v&k2=v2` query parameters
pub fn parse_query(q: &str) -> Result<Vec<(String, String)>> {
    let mut params = Vec::new();
    for pair in q.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (k, v) = match pair.split_once('=') {
            Some((k, v)) => (decode(k)?, decode(v)?),
            None => (decode(pair)?, String::new()),
        };
        params.push((k, v));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::builder::ModuleBuilder;
    use crate::meta::types::TypeSpec;

    fn sample() -> Rc<Schema> {
        ModuleBuilder::new("m")
            .container("a", |c| {
                c.container("b", |b| b.leaf("x", TypeSpec::new("string")))
            })
            .list("p", &["k"], |l| {
                l.leaf("k", TypeSpec::new("string"))
                    .container("q", |q| q.leaf("s", TypeSpec::new("string")))
            })
            .finalize()
            .unwrap()
    }

    #[test]
    fn test_parse_render_round_trip() {
        let schema = sample();
        let root = Path::root(Rc::clone(&schema));
        for p in ["a/b", "a/b/x", "p=walter", "p=walter/q/s"] {
            let slice = parse_url_path(&root, p).unwrap();
            let rendered = slice.tail.to_string();
            let reparsed = parse_url_path(&root, &rendered).unwrap();
            assert!(
                slice.tail.equal(&reparsed.tail),
                "round trip failed for {}",
                p
            );
        }
    }

    #[test]
    fn test_unknown_ident_is_not_found() {
        let schema = sample();
        let root = Path::root(schema);
        let err = parse_url_path(&root, "a/zzz").unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_key_count_mismatch() {
        let schema = sample();
        let root = Path::root(schema);
        let err = parse_url_path(&root, "p=a,b").unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_percent_decoding() {
        let schema = sample();
        let root = Path::root(schema);
        let slice = parse_url_path(&root, "p=hello%20world").unwrap();
        assert_eq!(slice.tail.key()[0].to_string(), "hello world");
        assert_eq!(slice.tail.to_string(), "/p=hello%20world");
    }

    #[test]
    fn test_depth() {
        let schema = sample();
        let root = Path::root(schema);
        let slice = parse_url_path(&root, "a/b/x").unwrap();
        assert_eq!(slice.tail.len(), 3);
        assert_eq!(slice.len(), 3);
    }

    #[test]
    fn test_query_split_and_parse() {
        let (p, q) = split_query("a/b?depth=2&content=config");
        assert_eq!(p, "a/b");
        let params = parse_query(q.unwrap()).unwrap();
        assert_eq!(params[0], ("depth".to_string(), "2".to_string()));
        assert_eq!(params[1], ("content".to_string(), "config".to_string()));
    }
}
