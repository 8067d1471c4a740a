use super::{event_name, flatten_owned};
use crate::{
    arena::{NodeId, ScopeId},
    nodes::{AttributeValue, VElement, VNode, VNodeKind},
    surface::RenderSurface,
    virtual_dom::{PendingMount, VirtualDom},
    Error, Result,
};
use std::{cmp::Ordering, collections::BTreeMap};

impl<R: RenderSurface> VirtualDom<R> {
    /// Create the host nodes for `node`, detached. `parent` is where they will end up, which components need to know
    /// to redraw themselves later.
    ///
    /// On failure nothing of `node` is left behind: its host nodes are removed, its components released and its
    /// mount hooks dropped.
    pub(crate) fn create_node(
        &mut self,
        node: &VNode,
        parent: NodeId,
        owner: Option<ScopeId>,
    ) -> Result<Vec<NodeId>> {
        let pending = self.pending_mounts.len();
        let created = self.create_node_inner(node, parent, owner);
        if created.is_err() {
            self.pending_mounts.truncate(pending);
            self.discard_node(node);
        }
        created
    }

    fn create_node_inner(
        &mut self,
        node: &VNode,
        parent: NodeId,
        owner: Option<ScopeId>,
    ) -> Result<Vec<NodeId>> {
        node.set_owner(owner);

        match node.kind() {
            VNodeKind::Text(text) => {
                let id = self.surface.create_text_node(&text.text);
                node.set_mount(Some(id));
                Ok(vec![id])
            }
            VNodeKind::Element(el) => {
                let id = self.create_element(el, owner)?;
                node.set_mount(Some(id));
                Ok(vec![id])
            }
            VNodeKind::Fragment(frag) => {
                let mut nodes = Vec::new();
                for child in flatten_owned(&frag.children, owner).iter().flatten() {
                    nodes.extend(self.create_node(child, parent, owner)?);
                }
                Ok(nodes)
            }
            VNodeKind::Component(comp) => self.create_component(node, comp, parent, owner),
        }
    }

    fn create_element(&mut self, el: &VElement, owner: Option<ScopeId>) -> Result<NodeId> {
        let id = self.surface.create_element(&el.tag)?;
        tracing::trace!(?id, tag = %el.tag, "created element");

        if let Some(el_id) = &el.id {
            self.surface
                .set_attribute(id, "id", &AttributeValue::Text(el_id.clone()));
        }
        if !el.classes.is_empty() {
            self.surface
                .set_attribute(id, "class", &AttributeValue::Text(el.classes.join(" ")));
        }
        for (name, value) in &el.attrs {
            self.add_attribute(id, name, value, owner);
        }

        for child in flatten_owned(&el.children, owner).iter().flatten() {
            match self.create_node(child, id, owner) {
                Ok(child_ids) => {
                    for child_id in child_ids {
                        self.surface.insert_before(id, child_id, None);
                    }
                }
                Err(err) => {
                    self.listeners.remove(&id);
                    self.surface.remove_node(id);
                    return Err(err);
                }
            }
        }

        if let Some(hook) = &el.hooks.on_mount {
            self.pending_mounts.push(PendingMount::Element {
                node: id,
                tag: el.tag.clone(),
                hook: hook.clone(),
            });
        }

        Ok(id)
    }

    /// Reconcile two views of the same shape. `old` hands its host bindings over to `new`.
    pub(crate) fn diff_node(
        &mut self,
        parent: NodeId,
        old: &VNode,
        new: &VNode,
        owner: Option<ScopeId>,
    ) -> Result<()> {
        // Reconciling a view against itself changes nothing
        if old.ptr_eq(new) {
            return Ok(());
        }

        new.set_owner(owner);

        match (old.kind(), new.kind()) {
            (VNodeKind::Text(old_text), VNodeKind::Text(new_text)) => {
                let id = old.take_mount().ok_or(Error::Detached { kind: "text node" })?;
                new.set_mount(Some(id));
                if old_text.text != new_text.text {
                    self.surface.set_text(id, &new_text.text);
                }
                Ok(())
            }

            (VNodeKind::Element(old_el), VNodeKind::Element(new_el)) => {
                let id = old.take_mount().ok_or(Error::Detached { kind: "element" })?;
                new.set_mount(Some(id));

                self.diff_element_props(id, old_el, new_el, owner);
                self.diff_children(id, &old_el.children, &new_el.children, None, owner)
            }

            (VNodeKind::Fragment(old_frag), VNodeKind::Fragment(new_frag)) => {
                let anchor = self.next_sibling_of(old);
                self.diff_children(parent, &old_frag.children, &new_frag.children, anchor, owner)
            }

            (VNodeKind::Component(old_comp), VNodeKind::Component(new_comp)) => {
                self.diff_component(old_comp, new, new_comp, owner)
            }

            _ => {
                let after = self.next_sibling_of(old);
                self.replace_slot(parent, old, new, after, owner)
            }
        }
    }

    fn diff_element_props(
        &mut self,
        id: NodeId,
        old: &VElement,
        new: &VElement,
        owner: Option<ScopeId>,
    ) {
        if old.id != new.id {
            match &new.id {
                Some(el_id) => self
                    .surface
                    .set_attribute(id, "id", &AttributeValue::Text(el_id.clone())),
                None => self.surface.remove_attribute(id, "id"),
            }
        }

        if !same_class_set(&old.classes, &new.classes) {
            if new.classes.is_empty() {
                self.surface.remove_attribute(id, "class");
            } else {
                let classes = AttributeValue::Text(new.classes.join(" "));
                self.surface.set_attribute(id, "class", &classes);
            }
        }

        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.owner = owner;
        }

        self.diff_attributes(id, &old.attrs, &new.attrs, owner);
    }

    fn diff_attributes(
        &mut self,
        id: NodeId,
        old: &BTreeMap<String, AttributeValue>,
        new: &BTreeMap<String, AttributeValue>,
        owner: Option<ScopeId>,
    ) {
        let mut old_iter = old.iter().peekable();
        let mut new_iter = new.iter().peekable();

        loop {
            match (old_iter.peek().copied(), new_iter.peek().copied()) {
                (Some((old_name, old_value)), Some((new_name, new_value))) => {
                    match old_name.cmp(new_name) {
                        // Present on both sides, only write if the value changed
                        Ordering::Equal => {
                            self.update_attribute(id, new_name, old_value, new_value, owner);
                            old_iter.next();
                            new_iter.next();
                        }
                        // In a sorted map, if the old name comes first the new map does not have it
                        Ordering::Less => {
                            self.remove_attribute(id, old_name, old_value);
                            old_iter.next();
                        }
                        Ordering::Greater => {
                            self.add_attribute(id, new_name, new_value, owner);
                            new_iter.next();
                        }
                    }
                }
                (Some((old_name, old_value)), None) => {
                    self.remove_attribute(id, old_name, old_value);
                    old_iter.next();
                }
                (None, Some((new_name, new_value))) => {
                    self.add_attribute(id, new_name, new_value, owner);
                    new_iter.next();
                }
                (None, None) => break,
            }
        }
    }

    fn add_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: &AttributeValue,
        owner: Option<ScopeId>,
    ) {
        match value {
            AttributeValue::Listener(handler) => {
                let event = event_name(name);
                let entry = self.listeners.entry(id).or_default();
                entry.owner = owner;
                entry.handlers.insert(event.to_string(), handler.clone());
                self.surface.create_event_listener(id, event);
            }
            _ => self.surface.set_attribute(id, name, value),
        }
    }

    fn remove_attribute(&mut self, id: NodeId, name: &str, value: &AttributeValue) {
        match value {
            AttributeValue::Listener(_) => {
                let event = event_name(name);
                if let Some(entry) = self.listeners.get_mut(&id) {
                    entry.handlers.remove(event);
                    if entry.handlers.is_empty() {
                        self.listeners.remove(&id);
                    }
                }
                self.surface.remove_event_listener(id, event);
            }
            _ => self.surface.remove_attribute(id, name),
        }
    }

    fn update_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        old: &AttributeValue,
        new: &AttributeValue,
        owner: Option<ScopeId>,
    ) {
        match (old, new) {
            // The surface only knows that someone listens. Swapping the handler is registry-only.
            (AttributeValue::Listener(_), AttributeValue::Listener(handler)) => {
                let entry = self.listeners.entry(id).or_default();
                entry.owner = owner;
                entry
                    .handlers
                    .insert(event_name(name).to_string(), handler.clone());
            }
            (AttributeValue::Listener(_), _) | (_, AttributeValue::Listener(_)) => {
                self.remove_attribute(id, name, old);
                self.add_attribute(id, name, new, owner);
            }
            _ if old.changed(new) => self.surface.set_attribute(id, name, new),
            _ => {}
        }
    }
}

fn same_class_set(old: &[String], new: &[String]) -> bool {
    old.len() == new.len() && old.iter().all(|class| new.contains(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::flatten;

    #[test]
    fn class_sets_ignore_order() {
        let a = ["x".to_string(), "y".to_string()];
        let b = ["y".to_string(), "x".to_string()];
        assert!(same_class_set(&a, &b));
        assert!(!same_class_set(&a, &a[..1]));
    }

    #[test]
    fn listener_attributes_name_their_event() {
        assert_eq!(event_name("onclick"), "click");
        assert_eq!(event_name("input"), "input");
    }

    #[test]
    fn flatten_splices_fragments() {
        let inner = crate::fragment(vec!["b", "c"]).unwrap();
        let flat = flatten(&[Some(crate::text("a")), Some(inner), None]);
        assert_eq!(flat.len(), 4);
        assert!(flat[3].is_none());
    }
}
