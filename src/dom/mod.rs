//! Document collaborator - an arena-backed mutable node tree.
//!
//! The reactivity core and the template compiler only need node/attribute/
//! event primitives, not a full host DOM: creation and deep cloning,
//! insertion before a sibling, removal, attribute get/set/remove, text
//! assignment, and listener add/remove/dispatch. This module provides
//! those capabilities over a node arena with a free-index pool, the same
//! allocation discipline as a component registry.
//!
//! Node handles are (document, id) pairs; freed ids return to the pool
//! for reuse, and operations on freed nodes are best-effort no-ops.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

// =============================================================================
// Ids and errors
// =============================================================================

/// Index into the document arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(usize);

/// Handle for removing a registered event listener.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(u64);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("node has been freed")]
    Freed,
    #[error("anchor is not a child of the target parent")]
    NotAChild,
}

/// An event delivered to listeners. The payload carries whatever the
/// host produced (an input's current value, a key name, ...).
pub struct Event {
    pub name: String,
    pub payload: Value,
}

// =============================================================================
// Document arena
// =============================================================================

enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        listeners: Vec<Listener>,
    },
    Text(String),
    Comment(String),
}

struct Listener {
    id: ListenerId,
    event: String,
    handler: Rc<dyn Fn(&Event)>,
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The mutable node tree. Clones share the arena.
#[derive(Clone, Default)]
pub struct Document {
    inner: Rc<DocInner>,
}

#[derive(Default)]
struct DocInner {
    nodes: RefCell<Vec<Option<NodeData>>>,
    free: RefCell<Vec<usize>>,
    next_listener: Cell<u64>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Node {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            attrs: IndexMap::new(),
            listeners: Vec::new(),
        })
    }

    pub fn create_text(&self, text: impl Into<String>) -> Node {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&self, text: impl Into<String>) -> Node {
        self.alloc(NodeKind::Comment(text.into()))
    }

    fn alloc(&self, kind: NodeKind) -> Node {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        let id = match self.inner.free.borrow_mut().pop() {
            Some(index) => {
                self.inner.nodes.borrow_mut()[index] = Some(data);
                NodeId(index)
            }
            None => {
                let mut nodes = self.inner.nodes.borrow_mut();
                nodes.push(Some(data));
                NodeId(nodes.len() - 1)
            }
        };
        Node {
            doc: self.clone(),
            id,
        }
    }

    fn node(&self, id: NodeId) -> Node {
        Node {
            doc: self.clone(),
            id,
        }
    }

    fn with<R>(&self, id: NodeId, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        self.inner.nodes.borrow().get(id.0)?.as_ref().map(f)
    }

    fn with_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut NodeData) -> R) -> Option<R> {
        self.inner.nodes.borrow_mut().get_mut(id.0)?.as_mut().map(f)
    }
}

// =============================================================================
// Node handle
// =============================================================================

/// Handle to one node in a document.
#[derive(Clone)]
pub struct Node {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.doc.inner, &other.doc.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.id.0)
    }
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn is_alive(&self) -> bool {
        self.doc.with(self.id, |_| ()).is_some()
    }

    pub fn is_element(&self) -> bool {
        self.doc
            .with(self.id, |d| matches!(d.kind, NodeKind::Element { .. }))
            .unwrap_or(false)
    }

    pub fn is_text(&self) -> bool {
        self.doc
            .with(self.id, |d| matches!(d.kind, NodeKind::Text(_)))
            .unwrap_or(false)
    }

    pub fn is_comment(&self) -> bool {
        self.doc
            .with(self.id, |d| matches!(d.kind, NodeKind::Comment(_)))
            .unwrap_or(false)
    }

    pub fn tag(&self) -> Option<String> {
        self.doc.with(self.id, |d| match &d.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        })?
    }

    pub fn text(&self) -> Option<String> {
        self.doc.with(self.id, |d| match &d.kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t.clone()),
            _ => None,
        })?
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.doc.with_mut(self.id, |d| {
            if let NodeKind::Text(t) | NodeKind::Comment(t) = &mut d.kind {
                *t = text.into();
            }
        });
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn attr(&self, name: &str) -> Option<String> {
        self.doc.with(self.id, |d| match &d.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            _ => None,
        })?
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<String>) {
        self.doc.with_mut(self.id, |d| {
            if let NodeKind::Element { attrs, .. } = &mut d.kind {
                attrs.insert(name.into(), value.into());
            }
        });
    }

    pub fn remove_attr(&self, name: &str) {
        self.doc.with_mut(self.id, |d| {
            if let NodeKind::Element { attrs, .. } = &mut d.kind {
                attrs.shift_remove(name);
            }
        });
    }

    /// Snapshot of attributes in insertion order.
    pub fn attrs(&self) -> Vec<(String, String)> {
        self.doc
            .with(self.id, |d| match &d.kind {
                NodeKind::Element { attrs, .. } => attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    pub fn parent(&self) -> Option<Node> {
        self.doc
            .with(self.id, |d| d.parent)?
            .map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> Vec<Node> {
        self.doc
            .with(self.id, |d| d.children.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|id| self.doc.node(id))
            .collect()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let siblings = self.doc.with(parent.id, |d| d.children.clone())?;
        let pos = siblings.iter().position(|id| *id == self.id)?;
        siblings.get(pos + 1).map(|id| self.doc.node(*id))
    }

    pub fn append_child(&self, child: &Node) {
        let _ = self.insert_before(child, None);
    }

    /// Insert `child` into this node's children, before `anchor` (or at
    /// the end when no anchor is given). The child is detached from any
    /// previous parent first.
    pub fn insert_before(&self, child: &Node, anchor: Option<&Node>) -> Result<(), DomError> {
        if !self.is_alive() || !child.is_alive() {
            return Err(DomError::Freed);
        }
        child.detach();
        let anchor_id = anchor.map(|a| a.id);
        let inserted = self
            .doc
            .with_mut(self.id, |d| {
                let position = match anchor_id {
                    Some(anchor_id) => match d.children.iter().position(|id| *id == anchor_id) {
                        Some(p) => p,
                        None => return false,
                    },
                    None => d.children.len(),
                };
                d.children.insert(position, child.id);
                true
            })
            .unwrap_or(false);
        if !inserted {
            return Err(DomError::NotAChild);
        }
        child.doc.with_mut(child.id, |d| d.parent = Some(self.id));
        Ok(())
    }

    /// Remove from the parent's child list without freeing, so the node
    /// can be re-inserted (list reordering).
    pub fn detach(&self) {
        let Some(parent_id) = self.doc.with(self.id, |d| d.parent).flatten() else {
            return;
        };
        self.doc.with_mut(parent_id, |d| {
            d.children.retain(|id| *id != self.id);
        });
        self.doc.with_mut(self.id, |d| d.parent = None);
    }

    /// Detach and free this node and its whole subtree. Ids return to
    /// the pool.
    pub fn destroy(&self) {
        self.detach();
        let mut pending = vec![self.id];
        while let Some(id) = pending.pop() {
            let data = self.doc.inner.nodes.borrow_mut()[id.0].take();
            if let Some(data) = data {
                pending.extend(data.children);
                self.doc.inner.free.borrow_mut().push(id.0);
            }
        }
    }

    /// Deep clone of this subtree: tags, attributes, text. Listeners are
    /// not cloned; compilation attaches fresh ones per mount.
    pub fn deep_clone(&self) -> Node {
        // Snapshot first: allocation re-borrows the arena.
        let blueprint = self.doc.with(self.id, |d| match &d.kind {
            NodeKind::Element { tag, attrs, .. } => NodeKind::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                listeners: Vec::new(),
            },
            NodeKind::Text(t) => NodeKind::Text(t.clone()),
            NodeKind::Comment(t) => NodeKind::Comment(t.clone()),
        });
        let clone = match blueprint {
            Some(kind) => self.doc.alloc(kind),
            // Cloning a freed node degrades to an empty placeholder.
            None => self.doc.create_comment(""),
        };
        for child in self.children() {
            clone.append_child(&child.deep_clone());
        }
        clone
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn add_listener(&self, event: impl Into<String>, handler: Rc<dyn Fn(&Event)>) -> ListenerId {
        let id = ListenerId(self.doc.inner.next_listener.get());
        self.doc.inner.next_listener.set(id.0 + 1);
        let event = event.into();
        self.doc.with_mut(self.id, |d| {
            if let NodeKind::Element { listeners, .. } = &mut d.kind {
                listeners.push(Listener {
                    id,
                    event,
                    handler,
                });
            }
        });
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.doc.with_mut(self.id, |d| {
            if let NodeKind::Element { listeners, .. } = &mut d.kind {
                listeners.retain(|l| l.id != id);
            }
        });
    }

    pub fn listener_count(&self) -> usize {
        self.doc
            .with(self.id, |d| match &d.kind {
                NodeKind::Element { listeners, .. } => listeners.len(),
                _ => 0,
            })
            .unwrap_or(0)
    }

    /// Deliver an event to this node's listeners. Handlers are
    /// snapshotted first so they may freely mutate the tree.
    pub fn dispatch(&self, name: &str, payload: Value) {
        let handlers: Vec<Rc<dyn Fn(&Event)>> = self
            .doc
            .with(self.id, |d| match &d.kind {
                NodeKind::Element { listeners, .. } => listeners
                    .iter()
                    .filter(|l| l.event == name)
                    .map(|l| l.handler.clone())
                    .collect(),
                _ => Vec::new(),
            })
            .unwrap_or_default();
        let event = Event {
            name: name.to_string(),
            payload,
        };
        for handler in handlers {
            handler(&event);
        }
    }

    // =========================================================================
    // Debug rendering
    // =========================================================================

    /// Markup-style rendering of this subtree, for assertions.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        let Some(()) = self.doc.with(self.id, |d| match &d.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Comment(t) => {
                out.push_str("<!--");
                out.push_str(t);
                out.push_str("-->");
            }
            NodeKind::Element { tag, attrs, .. } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    if !v.is_empty() {
                        out.push_str("=\"");
                        out.push_str(v);
                        out.push('"');
                    }
                }
                out.push('>');
            }
        }) else {
            return;
        };
        if self.is_element() {
            for child in self.children() {
                child.render_into(out);
            }
            if let Some(tag) = self.tag() {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }
}
