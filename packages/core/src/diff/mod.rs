//! This module contains all the code for creating and diffing views.
//!
//! Child lists are flattened before they are matched: fragments own no host node, so their children are spliced
//! into the surrounding list and take part in keyed matching like any other sibling. Everything that creates nodes
//! returns them detached; the caller decides where they go.

use crate::{
    arena::{NodeId, ScopeId},
    nodes::{VNode, VNodeKind},
    surface::RenderSurface,
    virtual_dom::{PendingMount, VirtualDom},
    Error, Result,
};

mod component;
mod keyed;
mod node;
mod unmount;

/// Flatten nested fragments into one list of slots.
pub(crate) fn flatten(children: &[Option<VNode>]) -> Vec<Option<VNode>> {
    let mut out = Vec::with_capacity(children.len());
    flatten_into(children, &mut out, &mut |_: &VNode| {});
    out
}

/// Like [`flatten`], but records `owner` on every fragment it walks through.
pub(crate) fn flatten_owned(children: &[Option<VNode>], owner: Option<ScopeId>) -> Vec<Option<VNode>> {
    let mut out = Vec::with_capacity(children.len());
    flatten_into(children, &mut out, &mut |frag: &VNode| frag.set_owner(owner));
    out
}

fn flatten_into(
    children: &[Option<VNode>],
    out: &mut Vec<Option<VNode>>,
    on_fragment: &mut dyn FnMut(&VNode),
) {
    for child in children {
        match child {
            Some(node) => match node.kind() {
                VNodeKind::Fragment(frag) => {
                    on_fragment(node);
                    flatten_into(&frag.children, out, on_fragment);
                }
                _ => out.push(Some(node.clone())),
            },
            None => out.push(None),
        }
    }
}

/// The event an `on…` attribute listens to.
pub(crate) fn event_name(attr: &str) -> &str {
    attr.strip_prefix("on").unwrap_or(attr)
}

impl<R: RenderSurface> VirtualDom<R> {
    /// The host nodes a view currently owns, in tree order.
    pub(crate) fn host_nodes(&self, node: &VNode) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_host_nodes(node, &mut out);
        out
    }

    fn collect_host_nodes(&self, node: &VNode, out: &mut Vec<NodeId>) {
        match node.kind() {
            VNodeKind::Element(_) | VNodeKind::Text(_) => out.extend(node.mounted_node()),
            VNodeKind::Fragment(frag) => {
                for child in frag.children.iter().flatten() {
                    self.collect_host_nodes(child, out);
                }
            }
            VNodeKind::Component(comp) => {
                let Some(scope) = comp.scope().and_then(|id| self.scopes.get(id)) else {
                    return;
                };
                match (&scope.placeholder, &scope.rendered) {
                    (Some(placeholder), _) => out.push(*placeholder),
                    (None, Some(rendered)) => self.collect_host_nodes(rendered, out),
                    (None, None) => {}
                }
            }
        }
    }

    pub(crate) fn first_host_node(&self, node: &VNode) -> Option<NodeId> {
        match node.kind() {
            VNodeKind::Element(_) | VNodeKind::Text(_) => node.mounted_node(),
            VNodeKind::Fragment(frag) => frag
                .children
                .iter()
                .flatten()
                .find_map(|child| self.first_host_node(child)),
            VNodeKind::Component(comp) => {
                let scope = self.scopes.get(comp.scope()?)?;
                match &scope.placeholder {
                    Some(placeholder) => Some(*placeholder),
                    None => self.first_host_node(scope.rendered.as_ref()?),
                }
            }
        }
    }

    pub(crate) fn last_host_node(&self, node: &VNode) -> Option<NodeId> {
        match node.kind() {
            VNodeKind::Element(_) | VNodeKind::Text(_) => node.mounted_node(),
            VNodeKind::Fragment(frag) => frag
                .children
                .iter()
                .rev()
                .flatten()
                .find_map(|child| self.last_host_node(child)),
            VNodeKind::Component(comp) => {
                let scope = self.scopes.get(comp.scope()?)?;
                match &scope.placeholder {
                    Some(placeholder) => Some(*placeholder),
                    None => self.last_host_node(scope.rendered.as_ref()?),
                }
            }
        }
    }

    /// The host node right after everything `node` owns.
    pub(crate) fn next_sibling_of(&self, node: &VNode) -> Option<NodeId> {
        self.last_host_node(node)
            .and_then(|last| self.surface.next_sibling(last))
    }

    /// Unmount `old`, create `new` and swap the host nodes.
    ///
    /// `after` is where `new` goes if `old` owns no host node to take the place of.
    pub(crate) fn replace_slot(
        &mut self,
        parent: NodeId,
        old: &VNode,
        new: &VNode,
        after: Option<NodeId>,
        owner: Option<ScopeId>,
    ) -> Result<()> {
        tracing::trace!(?parent, "replacing slot");
        let old_nodes = self.host_nodes(old);
        let reference = match old_nodes.last() {
            Some(last) => self.surface.next_sibling(*last),
            None => after,
        };

        // `old` is released either way, so its host nodes must go even if `new` cannot be created
        let unmounted = self.unmount_node(old);
        let new_nodes = match self.create_node(new, parent, owner) {
            Ok(nodes) => nodes,
            Err(err) => {
                for node in old_nodes {
                    self.surface.remove_node(node);
                }
                return Err(err);
            }
        };

        if let ([old_id], [new_id]) = (old_nodes.as_slice(), new_nodes.as_slice()) {
            self.surface.replace_node(*old_id, *new_id);
            return unmounted;
        }

        for node in new_nodes {
            self.surface.insert_before(parent, node, reference);
        }
        for node in old_nodes {
            self.surface.remove_node(node);
        }
        unmounted
    }

    /// Unmount `node` and remove its host nodes from the surface.
    pub(crate) fn remove_slot(&mut self, node: &VNode) -> Result<()> {
        let nodes = self.host_nodes(node);
        let unmounted = self.unmount_node(node);
        for id in nodes {
            self.surface.remove_node(id);
        }
        unmounted
    }

    /// Run the mount hooks collected during the pass, children before their parents.
    pub(crate) fn finish_pass(&mut self) -> Result<()> {
        for pending in std::mem::take(&mut self.pending_mounts) {
            match pending {
                PendingMount::Element { node, tag, hook } => {
                    hook(node).map_err(|source| Error::Hook {
                        name: format!("<{tag}>"),
                        hook: "on_mount",
                        source,
                    })?;
                }
                PendingMount::Component(scope) => {
                    let Some(state) = self.scopes.get(scope) else {
                        continue;
                    };
                    let Some(comp) = state.vnode.as_component() else {
                        continue;
                    };
                    let (component, handle) = (comp.component.clone(), comp.redraw_handle());
                    let state = state.state.clone();
                    component
                        .mounted(&*state, &handle)
                        .map_err(|source| Error::Hook {
                            name: component.name().to_string(),
                            hook: "on_mount",
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }
}
