//! An in-memory render surface.
//!
//! [`HeadlessSurface`] keeps a real host tree in a slab and records every call the engine makes as a [`Mutation`].
//! Tests assert on the mutation log to check what the reconciler did, and on the resulting tree (through
//! [`HeadlessSurface::to_html`] and friends) to check what it produced.

use crate::{
    arena::NodeId,
    nodes::AttributeValue,
    scheduler::{FrameTiming, FrameToken},
    surface::RenderSurface,
    Error, Result,
};
use rustc_hash::FxHashSet;
use slab::Slab;
use std::{
    cell::Cell,
    collections::{BTreeMap, BTreeSet},
    fmt::Write,
    rc::Rc,
};

/// One recorded call into the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement {
        tag: String,
        id: NodeId,
    },
    CreateTextNode {
        text: String,
        id: NodeId,
    },
    CreatePlaceholder {
        id: NodeId,
    },
    SetAttribute {
        name: String,
        value: AttributeValue,
        id: NodeId,
    },
    RemoveAttribute {
        name: String,
        id: NodeId,
    },
    NewEventListener {
        name: String,
        id: NodeId,
    },
    RemoveEventListener {
        name: String,
        id: NodeId,
    },
    InsertBefore {
        parent: NodeId,
        id: NodeId,
        reference: Option<NodeId>,
    },
    ReplaceWith {
        old: NodeId,
        new: NodeId,
    },
    Remove {
        id: NodeId,
    },
    SetText {
        text: String,
        id: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostKind {
    Element { tag: String },
    Text { text: String },
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct HostNode {
    pub kind: HostKind,
    pub attrs: BTreeMap<String, AttributeValue>,
    pub listeners: BTreeSet<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl HostNode {
    fn new(kind: HostKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            listeners: BTreeSet::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A host tree that lives in memory and logs every edit.
#[derive(Debug)]
pub struct HeadlessSurface {
    nodes: Slab<HostNode>,
    root: NodeId,
    tags: Option<FxHashSet<String>>,
    edits: Vec<Mutation>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    /// A surface with a single `root` element that accepts any tag.
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(HostNode::new(HostKind::Element {
            tag: "root".to_string(),
        })));
        Self {
            nodes,
            root,
            tags: None,
            edits: Vec::new(),
        }
    }

    /// Only accept these tags. Creating any other element fails with [`Error::UnknownTag`].
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn edits(&self) -> &[Mutation] {
        &self.edits
    }

    /// Drain the mutation log.
    pub fn take_edits(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.edits)
    }

    pub fn node(&self, id: NodeId) -> Option<&HostNode> {
        self.nodes.get(id.0)
    }

    /// Live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&AttributeValue> {
        self.node(id).and_then(|n| n.attrs.get(name))
    }

    pub fn has_listener(&self, id: NodeId, event: &str) -> bool {
        self.node(id).is_some_and(|n| n.listeners.contains(event))
    }

    /// The concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        if let HostKind::Text { text } = &node.kind {
            out.push_str(text);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Serialize the children of `id` as markup. Placeholders show up as empty comments.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_html(*child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            HostKind::Text { text } => out.push_str(&escape(text)),
            HostKind::Placeholder => out.push_str("<!---->"),
            HostKind::Element { tag } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attrs {
                    match value {
                        AttributeValue::Text(v) => {
                            let _ = write!(out, " {name}=\"{}\"", escape(v));
                        }
                        AttributeValue::Int(v) => {
                            let _ = write!(out, " {name}=\"{v}\"");
                        }
                        AttributeValue::Float(v) => {
                            let _ = write!(out, " {name}=\"{v}\"");
                        }
                        AttributeValue::Bool(true) | AttributeValue::None => {
                            let _ = write!(out, " {name}");
                        }
                        AttributeValue::Bool(false) | AttributeValue::Listener(_) => {}
                    }
                }
                out.push('>');
                for child in &node.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn insert(&mut self, kind: HostKind) -> NodeId {
        NodeId(self.nodes.insert(HostNode::new(kind)))
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id.0).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(parent.0) {
            parent.children.retain(|c| *c != id);
        }
    }

    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.try_remove(id.0) {
            for child in node.children {
                self.free(child);
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl RenderSurface for HeadlessSurface {
    fn create_element(&mut self, tag: &str) -> Result<NodeId> {
        if let Some(tags) = &self.tags {
            if !tags.contains(tag) {
                return Err(Error::UnknownTag {
                    tag: tag.to_string(),
                });
            }
        }
        let id = self.insert(HostKind::Element {
            tag: tag.to_string(),
        });
        self.edits.push(Mutation::CreateElement {
            tag: tag.to_string(),
            id,
        });
        Ok(id)
    }

    fn create_text_node(&mut self, text: &str) -> NodeId {
        let id = self.insert(HostKind::Text {
            text: text.to_string(),
        });
        self.edits.push(Mutation::CreateTextNode {
            text: text.to_string(),
            id,
        });
        id
    }

    fn create_placeholder(&mut self) -> NodeId {
        let id = self.insert(HostKind::Placeholder);
        self.edits.push(Mutation::CreatePlaceholder { id });
        id
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &AttributeValue) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.attrs.insert(name.to_string(), value.clone());
        }
        self.edits.push(Mutation::SetAttribute {
            name: name.to_string(),
            value: value.clone(),
            id: node,
        });
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.attrs.remove(name);
        }
        self.edits.push(Mutation::RemoveAttribute {
            name: name.to_string(),
            id: node,
        });
    }

    fn create_event_listener(&mut self, node: NodeId, event: &str) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.listeners.insert(event.to_string());
        }
        self.edits.push(Mutation::NewEventListener {
            name: event.to_string(),
            id: node,
        });
    }

    fn remove_event_listener(&mut self, node: NodeId, event: &str) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.listeners.remove(event);
        }
        self.edits.push(Mutation::RemoveEventListener {
            name: event.to_string(),
            id: node,
        });
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.edits.push(Mutation::InsertBefore {
            parent,
            id: node,
            reference,
        });
        if reference == Some(node) || !self.nodes.contains(parent.0) {
            return;
        }

        self.detach(node);

        let Some(p) = self.nodes.get_mut(parent.0) else {
            return;
        };
        let idx = reference
            .and_then(|r| p.children.iter().position(|c| *c == r))
            .unwrap_or(p.children.len());
        p.children.insert(idx, node);

        if let Some(n) = self.nodes.get_mut(node.0) {
            n.parent = Some(parent);
        }
    }

    fn replace_node(&mut self, old: NodeId, new: NodeId) {
        self.edits.push(Mutation::ReplaceWith { old, new });

        self.detach(new);
        let parent = self.nodes.get(old.0).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent.0) {
                if let Some(slot) = p.children.iter_mut().find(|c| **c == old) {
                    *slot = new;
                }
            }
            if let Some(n) = self.nodes.get_mut(new.0) {
                n.parent = Some(parent);
            }
        }
        if let Some(n) = self.nodes.get_mut(old.0) {
            n.parent = None;
        }
        self.free(old);
    }

    fn remove_node(&mut self, node: NodeId) {
        self.edits.push(Mutation::Remove { id: node });
        self.detach(node);
        self.free(node);
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.kind = HostKind::Text {
                text: text.to_string(),
            };
        }
        self.edits.push(Mutation::SetText {
            text: text.to_string(),
            id: node,
        });
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|c| *c == node)?;
        siblings.get(idx + 1).copied()
    }
}

/// A [`FrameTiming`] that only counts how many frames were requested. Clones share the count.
#[derive(Clone, Debug, Default)]
pub struct FrameCounter(Rc<Cell<u64>>);

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> u64 {
        self.0.get()
    }
}

impl FrameTiming for FrameCounter {
    fn request_frame(&mut self) -> FrameToken {
        self.0.set(self.0.get() + 1);
        FrameToken(self.0.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_attached_nodes() {
        let mut dom = HeadlessSurface::new();
        let root = dom.root();
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        let c = dom.create_text_node("c");
        dom.insert_before(root, a, None);
        dom.insert_before(root, b, None);
        dom.insert_before(root, c, None);

        dom.insert_before(root, c, Some(a));
        assert_eq!(dom.children(root), &[c, a, b]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.next_sibling(b), None);
        assert_eq!(dom.text_content(root), "cab");
    }

    #[test]
    fn replace_releases_the_old_subtree() {
        let mut dom = HeadlessSurface::new();
        let root = dom.root();
        let div = dom.create_element("div").unwrap();
        let text = dom.create_text_node("x");
        dom.insert_before(div, text, None);
        dom.insert_before(root, div, None);

        let span = dom.create_element("span").unwrap();
        dom.replace_node(div, span);

        assert_eq!(dom.children(root), &[span]);
        assert!(dom.node(div).is_none());
        assert!(dom.node(text).is_none());
        assert_eq!(dom.to_html(root), "<span></span>");
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let mut dom = HeadlessSurface::new().with_tags(["div"]);
        assert!(dom.create_element("div").is_ok());
        assert!(matches!(
            dom.create_element("blink"),
            Err(Error::UnknownTag { tag }) if tag == "blink"
        ));
    }
}
