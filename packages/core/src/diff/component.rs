use crate::{
    any_component::AnyComponent,
    arena::{NodeId, ScopeId},
    nodes::{VComponent, VNode},
    scopes::{RedrawHandle, ScopeState},
    surface::RenderSurface,
    virtual_dom::{PendingMount, VirtualDom},
    Error, Result,
};
use std::{any::Any, rc::Rc};

impl<R: RenderSurface> VirtualDom<R> {
    /// Mount a new component instance and create its output.
    pub(super) fn create_component(
        &mut self,
        node: &VNode,
        comp: &VComponent,
        parent: NodeId,
        owner: Option<ScopeId>,
    ) -> Result<Vec<NodeId>> {
        let height = owner
            .and_then(|owner| self.scopes.get(owner))
            .map_or(0, |owner| owner.height + 1);

        let scope = self.scopes.insert(ScopeState {
            vnode: node.clone(),
            state: comp.component.init_state(),
            rendered: None,
            placeholder: None,
            parent: owner,
            host_parent: parent,
            height,
        });
        let handle = comp.redraw_handle();
        handle.bind(scope, &self.scheduler);
        tracing::trace!(?scope, name = comp.name(), "mounting component");

        let rendered = match self.render_scope(scope) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.scopes.remove(scope);
                handle.clear();
                return Err(err);
            }
        };

        let mut nodes = self.create_node(&rendered, parent, Some(scope))?;
        if let Some(state) = self.scopes.get_mut(scope) {
            state.rendered = Some(rendered);
            if nodes.is_empty() {
                let placeholder = self.surface.create_placeholder();
                state.placeholder = Some(placeholder);
                nodes.push(placeholder);
            }
        }

        self.rendered_this_pass.insert(scope);
        if comp.component.has_mount_hook() {
            self.pending_mounts.push(PendingMount::Component(scope));
        }

        Ok(nodes)
    }

    /// The identity rule: same generator at the same position means the same instance.
    ///
    /// The new view takes over the old view's handle and state. The equality gate decides whether the generator runs
    /// again; if it does not, the previous output stays mounted untouched.
    pub(super) fn diff_component(
        &mut self,
        old: &VComponent,
        new_node: &VNode,
        new: &VComponent,
        owner: Option<ScopeId>,
    ) -> Result<()> {
        let scope = old
            .scope()
            .filter(|scope| self.scopes.contains_key(*scope))
            .ok_or(Error::Detached { kind: "component" })?;

        let handle = old.redraw_handle();
        *new.handle.borrow_mut() = handle;

        let Some(state) = self.scopes.get_mut(scope) else {
            return Err(Error::Detached { kind: "component" });
        };
        state.vnode = new_node.clone();
        state.parent = owner;
        let component_state = state.state.clone();

        if !new.component.should_update(&*old.component, &*component_state) {
            tracing::trace!(?scope, name = new.name(), "memoized component");
            return Ok(());
        }

        if self.rendered_this_pass.contains(&scope) {
            return Ok(());
        }

        self.rerender_scope(scope)
    }

    /// Run the generator of a mounted component and apply the copy rule to its output.
    fn render_scope(&mut self, scope: ScopeId) -> Result<VNode> {
        let (component, state, handle) = self.scope_parts(scope)?;
        let rendered = component
            .render(&*state, &handle)
            .map_err(|source| Error::Render {
                name: component.name(),
                source,
            })?;
        Ok(rendered.adopt())
    }

    fn scope_parts(&self, scope: ScopeId) -> Result<(Rc<dyn AnyComponent>, Rc<dyn Any>, RedrawHandle)> {
        let state = self
            .scopes
            .get(scope)
            .ok_or(Error::Detached { kind: "component" })?;
        let comp = state
            .vnode
            .as_component()
            .ok_or(Error::Detached { kind: "component" })?;
        Ok((comp.component.clone(), state.state.clone(), comp.redraw_handle()))
    }

    /// Regenerate a mounted component and reconcile the new output against the previous one in place.
    pub(crate) fn rerender_scope(&mut self, scope: ScopeId) -> Result<()> {
        tracing::trace!(?scope, "regenerating component");
        let new = self.render_scope(scope)?;

        let Some(state) = self.scopes.get_mut(scope) else {
            return Err(Error::Detached { kind: "component" });
        };
        let old = state.rendered.take();
        let placeholder = state.placeholder;
        let parent = state.host_parent;

        let anchor = match (placeholder, &old) {
            (Some(placeholder), _) => Some(placeholder),
            (None, Some(old)) => self.next_sibling_of(old),
            (None, None) => None,
        };

        let result = self.diff_children(parent, &[old], &[Some(new.clone())], anchor, Some(scope));

        let produced = self.first_host_node(&new).is_some();
        if let Some(state) = self.scopes.get_mut(scope) {
            state.rendered = Some(new);
            match (placeholder, produced) {
                (Some(placeholder), true) => {
                    state.placeholder = None;
                    self.surface.remove_node(placeholder);
                }
                (None, false) => {
                    let placeholder = self.surface.create_placeholder();
                    state.placeholder = Some(placeholder);
                    self.surface.insert_before(parent, placeholder, anchor);
                }
                _ => {}
            }
        }
        self.rendered_this_pass.insert(scope);

        result
    }
}
