//! The identity-discard walk.
//!
//! Unmounting releases what the engine holds for a view (listener registrations, host bindings, component
//! instances) and runs unmount hooks, but never touches the render surface. Whoever decided the view is gone removes
//! its top-level host nodes afterwards.

use crate::{
    nodes::{VComponent, VNode, VNodeKind},
    surface::RenderSurface,
    virtual_dom::VirtualDom,
    Error, Result,
};

impl<R: RenderSurface> VirtualDom<R> {
    /// Unmount a view and everything below it.
    ///
    /// A failing hook does not stop the walk: the whole subtree is released and the first error is returned.
    pub(crate) fn unmount_node(&mut self, node: &VNode) -> Result<()> {
        let mut errors = Vec::new();
        self.unmount_walk(node, &mut Some(&mut errors));
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Release a view whose creation failed and remove whatever host nodes it got. No hook runs, since nothing of it
    /// was ever mounted.
    pub(crate) fn discard_node(&mut self, node: &VNode) {
        tracing::trace!("discarding a partially created view");
        let nodes = self.host_nodes(node);
        self.unmount_walk(node, &mut None);
        for id in nodes {
            self.surface.remove_node(id);
        }
    }

    // `errors` is `None` when hooks must not run
    fn unmount_walk(&mut self, node: &VNode, errors: &mut Option<&mut Vec<Error>>) {
        match node.kind() {
            VNodeKind::Text(_) => {
                node.take_mount();
            }

            // Children first, so unmount hooks fire bottom-up
            VNodeKind::Element(el) => {
                for child in el.children.iter().flatten() {
                    self.unmount_walk(child, errors);
                }

                let Some(id) = node.take_mount() else { return };
                self.listeners.remove(&id);

                let Some(errors) = errors.as_deref_mut() else { return };
                if let Some(hook) = &el.hooks.on_unmount {
                    if let Err(source) = hook(id) {
                        errors.push(Error::Hook {
                            name: format!("<{}>", el.tag),
                            hook: "on_unmount",
                            source,
                        });
                    }
                }
            }

            VNodeKind::Fragment(frag) => {
                for child in frag.children.iter().flatten() {
                    self.unmount_walk(child, errors);
                }
            }

            VNodeKind::Component(comp) => self.unmount_component(comp, errors),
        }
    }

    fn unmount_component(&mut self, comp: &VComponent, errors: &mut Option<&mut Vec<Error>>) {
        let handle = comp.redraw_handle();
        let Some(scope) = handle.scope() else { return };
        let Some(state) = self.scopes.get(scope) else {
            handle.clear();
            return;
        };

        // The hook sees the props of the latest view, which may be newer than `comp`
        let current = state.vnode.as_component().map(|c| c.component.clone());
        let component_state = state.state.clone();
        let rendered = state.rendered.clone();

        tracing::trace!(?scope, name = comp.name(), "unmounting component");
        if let (Some(component), Some(errors)) = (current, errors.as_deref_mut()) {
            if let Err(source) = component.unmounted(&*component_state, &handle) {
                errors.push(Error::Hook {
                    name: component.name().to_string(),
                    hook: "on_unmount",
                    source,
                });
            }
        }

        if let Some(rendered) = rendered {
            self.unmount_walk(&rendered, errors);
        }

        self.scopes.remove(scope);
        self.rendered_this_pass.remove(&scope);
        handle.clear();
    }
}
