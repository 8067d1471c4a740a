//! The host tree the engine reconciles into.

use crate::{arena::NodeId, nodes::AttributeValue, Result};

/// A render surface for the engine to mutate while reconciling.
///
/// The surface owns the real nodes and hands out [`NodeId`]s for them. Nodes are created detached and attached with
/// [`RenderSurface::insert_before`]. The engine guarantees it only passes back ids this surface produced and never
/// uses an id after removing it.
pub trait RenderSurface {
    /// Create a detached element. Fails with [`Error::UnknownTag`](crate::Error::UnknownTag) if the host has no
    /// mapping for `tag`.
    fn create_element(&mut self, tag: &str) -> Result<NodeId>;
    /// Create a detached text node
    fn create_text_node(&mut self, text: &str) -> NodeId;
    /// Create a detached node that renders as nothing and only holds a position
    fn create_placeholder(&mut self) -> NodeId;

    /// Set an attribute on an element. Never called with [`AttributeValue::Listener`].
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &AttributeValue);
    /// Remove an attribute from an element
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Start forwarding `event` on this node to the engine
    fn create_event_listener(&mut self, node: NodeId, event: &str);
    /// Stop forwarding `event` on this node
    fn remove_event_listener(&mut self, node: NodeId, event: &str);

    /// Insert `node` under `parent` before `reference`, or at the end when `reference` is `None`.
    ///
    /// If `node` is already attached somewhere it is moved.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);
    /// Put `new` where `old` is and detach `old`
    fn replace_node(&mut self, old: NodeId, new: NodeId);
    /// Detach a node and release it together with its subtree
    fn remove_node(&mut self, node: NodeId);

    /// Set the text content of a text node
    fn set_text(&mut self, node: NodeId, text: &str);

    /// The node after `node` under the same parent.
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}
