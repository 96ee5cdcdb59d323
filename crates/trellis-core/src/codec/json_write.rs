//! JSON writer node
//!
//! A `Node` over a byte stream: the editor's `child(new)` opens a nested
//! object, `next(new)` opens an array element, `field` emits
//! `"name":value`. Each open frame tracks a comma-pending flag; frames
//! deeper than the operating node close automatically when a sibling is
//! written, and everything closes when the edit root ends. Fields the
//! editor never writes are simply absent from the output.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::errors::{Result, TrellisError};
use crate::node::{
    ChildRequest, FieldRequest, ListRequest, Node, NodeRequest, ValueHandle,
};
use trellis_core_types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Object,
    Array,
    ArrayItem,
}

struct Frame {
    kind: FrameKind,
    comma_pending: bool,
}

struct WriterState {
    out: Box<dyn Write>,
    frames: Vec<Frame>,
    started: bool,
    closed: bool,
}

impl WriterState {
    fn io(&mut self, res: io::Result<()>) -> Result<()> {
        res.map_err(|e| TrellisError::Serialization {
            message: e.to_string(),
        })
    }

    fn ensure_started(&mut self) -> Result<()> {
        if !self.started {
            self.started = true;
            let r = self.out.write_all(b"{");
            self.io(r)?;
            self.frames.push(Frame {
                kind: FrameKind::Object,
                comma_pending: false,
            });
        }
        Ok(())
    }

    /// Close frames deeper than `target` frames
    fn unwind(&mut self, target: usize) -> Result<()> {
        while self.frames.len() > target {
            let frame = self.frames.pop().expect("frame underflow");
            let closer: &[u8] = match frame.kind {
                FrameKind::Object | FrameKind::ArrayItem => b"}",
                FrameKind::Array => b"]",
            };
            let r = self.out.write_all(closer);
            self.io(r)?;
            if let Some(parent) = self.frames.last_mut() {
                parent.comma_pending = true;
            }
        }
        Ok(())
    }

    fn comma(&mut self) -> Result<()> {
        if let Some(top) = self.frames.last_mut() {
            if top.comma_pending {
                top.comma_pending = false;
                let r = self.out.write_all(b",");
                self.io(r)?;
            }
        }
        Ok(())
    }

    fn open(&mut self, name: Option<&str>, kind: FrameKind) -> Result<()> {
        self.comma()?;
        let mut lead = String::new();
        if let Some(name) = name {
            lead.push_str(&serde_json::to_string(name)?);
            lead.push(':');
        }
        lead.push(match kind {
            FrameKind::Object | FrameKind::ArrayItem => '{',
            FrameKind::Array => '[',
        });
        let r = self.out.write_all(lead.as_bytes());
        self.io(r)?;
        self.frames.push(Frame {
            kind,
            comma_pending: false,
        });
        Ok(())
    }

    fn emit_field(&mut self, name: &str, value: &Value) -> Result<()> {
        self.comma()?;
        let encoded = format!(
            "{}:{}",
            serde_json::to_string(name)?,
            serde_json::to_string(&value.to_json())?
        );
        let r = self.out.write_all(encoded.as_bytes());
        self.io(r)?;
        if let Some(top) = self.frames.last_mut() {
            top.comma_pending = true;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.ensure_started()?;
        self.unwind(0)?;
        self.closed = true;
        let r = self.out.flush();
        self.io(r)
    }
}

impl Drop for WriterState {
    fn drop(&mut self) {
        // stream release on every exit path; errors are already surfaced
        // on the explicit finish
        let _ = self.finish();
    }
}

/// Streaming JSON writer; `node()` is given to the editor as the
/// destination
pub struct JsonWriter {
    state: Rc<RefCell<WriterState>>,
}

impl JsonWriter {
    pub fn new(out: impl Write + 'static) -> JsonWriter {
        JsonWriter {
            state: Rc::new(RefCell::new(WriterState {
                out: Box::new(out),
                frames: Vec::new(),
                started: false,
                closed: false,
            })),
        }
    }

    pub fn node(&self) -> Rc<dyn Node> {
        Rc::new(JsonWriterNode {
            state: Rc::clone(&self.state),
            depth: 0,
        })
    }

    /// Close any open frames and flush the stream
    pub fn finish(&self) -> Result<()> {
        self.state.borrow_mut().finish()
    }
}

struct JsonWriterNode {
    state: Rc<RefCell<WriterState>>,
    depth: usize,
}

impl JsonWriterNode {
    fn deeper(&self) -> Rc<JsonWriterNode> {
        Rc::new(JsonWriterNode {
            state: Rc::clone(&self.state),
            depth: self.depth + 1,
        })
    }
}

impl Node for JsonWriterNode {
    fn child(&self, r: &ChildRequest) -> Result<Option<Rc<dyn Node>>> {
        if r.delete {
            return Err(TrellisError::Forbidden {
                reason: "writer cannot delete".to_string(),
            });
        }
        if !r.new {
            // nothing exists in a fresh output stream
            return Ok(None);
        }
        let schema = r.sel.schema();
        let ident = schema.ident(r.meta);
        let kind = if schema.is_list(r.meta) {
            FrameKind::Array
        } else {
            FrameKind::Object
        };
        {
            let mut state = self.state.borrow_mut();
            state.ensure_started()?;
            state.unwind(self.depth + 1)?;
            state.open(Some(ident), kind)?;
        }
        Ok(Some(self.deeper()))
    }

    fn next(&self, r: &ListRequest) -> Result<Option<(Rc<dyn Node>, Vec<Value>)>> {
        if r.delete {
            return Err(TrellisError::Forbidden {
                reason: "writer cannot delete".to_string(),
            });
        }
        if !r.new {
            return Ok(None);
        }
        {
            let mut state = self.state.borrow_mut();
            state.ensure_started()?;
            state.unwind(self.depth + 1)?;
            state.open(None, FrameKind::ArrayItem)?;
        }
        Ok(Some((self.deeper() as Rc<dyn Node>, r.key.clone())))
    }

    fn field(&self, r: &FieldRequest, hnd: &mut ValueHandle) -> Result<()> {
        if !r.write {
            return Ok(());
        }
        let Some(v) = hnd.val.take() else {
            return Ok(());
        };
        let schema = r.sel.schema();
        let mut state = self.state.borrow_mut();
        state.ensure_started()?;
        state.unwind(self.depth + 1)?;
        state.emit_field(schema.ident(r.meta), &v)
    }

    fn end_edit(&self, r: &NodeRequest) -> Result<()> {
        if r.edit_root {
            self.state.borrow_mut().finish()?;
        }
        Ok(())
    }
}

/// Shared in-memory sink for tests and small captures
#[derive(Clone, Default)]
pub struct SharedBuffer {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> SharedBuffer {
        SharedBuffer::default()
    }

    pub fn string(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
