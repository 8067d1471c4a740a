use std::fmt;

/// A handle to a node in the external render tree.
///
/// The engine never looks inside a `NodeId`; it only hands them back to the [`RenderSurface`](crate::RenderSurface)
/// that produced them. Renderers are expected to keep their nodes in something like a slab or slotmap where indexing
/// by id is cheap.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

slotmap::new_key_type! {
    /// The identity of a mounted component.
    ///
    /// Scope ids are generational: once a component is discarded its id never resolves again, even if the slot is
    /// reused by a later component. Stale redraw requests rely on this to drop themselves.
    pub struct ScopeId;
}
