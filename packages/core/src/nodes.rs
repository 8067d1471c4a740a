//! Virtual Node Support
//!
//! A [`VNode`] describes the desired UI shape at one tree position. VNodes are cheap to clone (they are a reference
//! counted handle) and immutable by convention: the only thing the engine ever writes into them is its own
//! bookkeeping (the materialized host node, the owning component, and whether the node was already placed in a tree).

use crate::{
    any_component::AnyComponent,
    arena::{NodeId, ScopeId},
    events::EventHandler,
    scopes::RedrawHandle,
};
use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt::{self, Debug, Display},
    rc::Rc,
};

/// An identity token that distinguishes otherwise similar siblings across reconciliations.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    Key::Int(value as i64)
                }
            }
        )*
    };
}

key_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

/// The value side of an element's attribute map.
#[derive(Clone, Debug)]
pub enum AttributeValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    /// An event handler. Never written to the render surface directly; the surface only learns that a listener
    /// exists and forwards events back through the engine.
    Listener(EventHandler),
    /// The attribute is present in the map but carries no value.
    None,
}

impl AttributeValue {
    /// Whether writing `other` over `self` changes anything visible to the render surface.
    pub(crate) fn changed(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Text(l), AttributeValue::Text(r)) => l != r,
            (AttributeValue::Float(l), AttributeValue::Float(r)) => l != r,
            (AttributeValue::Int(l), AttributeValue::Int(r)) => l != r,
            (AttributeValue::Bool(l), AttributeValue::Bool(r)) => l != r,
            (AttributeValue::None, AttributeValue::None) => false,
            (AttributeValue::Listener(_), AttributeValue::Listener(_)) => false,
            _ => true,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Listener(l), AttributeValue::Listener(r)) => l.ptr_eq(r),
            _ => !self.changed(other),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(value as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<EventHandler> for AttributeValue {
    fn from(value: EventHandler) -> Self {
        AttributeValue::Listener(value)
    }
}

pub(crate) type ElementHook = Rc<dyn Fn(NodeId) -> anyhow::Result<()>>;

/// Lifecycle hooks attached to a single element.
#[derive(Clone, Default)]
pub struct ElementHooks {
    pub(crate) on_mount: Option<ElementHook>,
    pub(crate) on_unmount: Option<ElementHook>,
}

impl Debug for ElementHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHooks")
            .field("on_mount", &self.on_mount.is_some())
            .field("on_unmount", &self.on_unmount.is_some())
            .finish()
    }
}

/// A single host node: tag, id, classes, attributes and an ordered child list.
#[derive(Clone, Debug)]
pub struct VElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    /// Sorted by name so two maps can be diffed in one merge walk.
    pub attrs: BTreeMap<String, AttributeValue>,
    pub key: Option<Key>,
    pub children: Vec<Option<VNode>>,
    pub hooks: ElementHooks,
}

/// A transparent group of children with no host node of its own.
#[derive(Clone, Debug, Default)]
pub struct VFragment {
    pub children: Vec<Option<VNode>>,
}

/// A leaf text value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VText {
    pub text: String,
}

/// A component view: a type-erased generator with its props, hooks, key and redraw handle.
pub struct VComponent {
    pub(crate) name: &'static str,
    pub(crate) key: Option<Key>,
    pub(crate) component: Rc<dyn AnyComponent>,
    pub(crate) handle: RefCell<RedrawHandle>,
}

impl VComponent {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The handle currently installed on this view. After reconciliation this is the handle shared by every copy of
    /// the same component identity.
    pub fn redraw_handle(&self) -> RedrawHandle {
        self.handle.borrow().clone()
    }

    pub(crate) fn scope(&self) -> Option<ScopeId> {
        self.handle.borrow().scope()
    }

    pub(crate) fn same_generator(&self, other: &VComponent) -> bool {
        self.component.same_generator(&*other.component)
    }
}

impl Debug for VComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VComponent")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("handle", &*self.handle.borrow())
            .finish()
    }
}

/// The four kinds of view.
#[derive(Debug)]
pub enum VNodeKind {
    Element(VElement),
    Fragment(VFragment),
    Text(VText),
    Component(VComponent),
}

pub(crate) struct VNodeInner {
    kind: VNodeKind,

    /// The host node this view materialized into. Only elements and text nodes own one directly.
    mount: Cell<Option<NodeId>>,

    /// The nearest enclosing component, looked up when a redraw targets a non-component view.
    owner: Cell<Option<ScopeId>>,

    /// Set once the view is placed in a tree. A parented view that is placed again gets copied.
    parented: Cell<bool>,
}

/// A view: an immutable description of the desired UI at one tree position.
#[derive(Clone)]
pub struct VNode {
    inner: Rc<VNodeInner>,
}

impl VNode {
    pub(crate) fn new(kind: VNodeKind) -> Self {
        Self {
            inner: Rc::new(VNodeInner {
                kind,
                mount: Cell::new(None),
                owner: Cell::new(None),
                parented: Cell::new(false),
            }),
        }
    }

    /// A fragment with no children.
    pub fn empty() -> Self {
        Self::new(VNodeKind::Fragment(VFragment::default()))
    }

    pub fn kind(&self) -> &VNodeKind {
        &self.inner.kind
    }

    pub fn key(&self) -> Option<&Key> {
        match self.kind() {
            VNodeKind::Element(el) => el.key.as_ref(),
            VNodeKind::Component(comp) => comp.key.as_ref(),
            VNodeKind::Fragment(_) | VNodeKind::Text(_) => None,
        }
    }

    /// The host node this view currently owns, if it is a mounted element or text node.
    pub fn mounted_node(&self) -> Option<NodeId> {
        self.inner.mount.get()
    }

    /// The redraw handle of a component view.
    pub fn redraw_handle(&self) -> Option<RedrawHandle> {
        self.as_component().map(VComponent::redraw_handle)
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self.kind() {
            VNodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&VComponent> {
        match self.kind() {
            VNodeKind::Component(comp) => Some(comp),
            _ => None,
        }
    }

    pub fn is_parented(&self) -> bool {
        self.inner.parented.get()
    }

    pub(crate) fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_mount(&self, id: Option<NodeId>) {
        self.inner.mount.set(id);
    }

    pub(crate) fn take_mount(&self) -> Option<NodeId> {
        self.inner.mount.take()
    }

    pub(crate) fn owner(&self) -> Option<ScopeId> {
        self.inner.owner.get()
    }

    pub(crate) fn set_owner(&self, owner: Option<ScopeId>) {
        self.inner.owner.set(owner);
    }

    /// Whether `self` and `other` can be reconciled in place rather than replaced.
    pub(crate) fn same_shape(&self, other: &VNode) -> bool {
        match (self.kind(), other.kind()) {
            (VNodeKind::Text(_), VNodeKind::Text(_)) => true,
            (VNodeKind::Fragment(_), VNodeKind::Fragment(_)) => true,
            (VNodeKind::Element(old), VNodeKind::Element(new)) => old.tag == new.tag,
            (VNodeKind::Component(old), VNodeKind::Component(new)) => old.same_generator(new),
            _ => false,
        }
    }

    /// Place this view under a parent.
    ///
    /// An unparented view is adopted as is. A view that already sits somewhere else is copied so the two positions
    /// never share render-tree bindings: elements, fragments and text are deep copied, components are shallow copied
    /// with a fresh redraw handle.
    pub(crate) fn adopt(self) -> VNode {
        if !self.inner.parented.replace(true) {
            return self;
        }
        let copy = self.deep_copy();
        copy.inner.parented.set(true);
        copy
    }

    pub(crate) fn deep_copy(&self) -> VNode {
        let copy_children = |children: &[Option<VNode>]| {
            children
                .iter()
                .map(|child| {
                    child.as_ref().map(|child| {
                        let copy = child.deep_copy();
                        copy.inner.parented.set(true);
                        copy
                    })
                })
                .collect()
        };

        let kind = match self.kind() {
            VNodeKind::Element(el) => VNodeKind::Element(VElement {
                children: copy_children(&el.children),
                ..el.clone()
            }),
            VNodeKind::Fragment(frag) => VNodeKind::Fragment(VFragment {
                children: copy_children(&frag.children),
            }),
            VNodeKind::Text(text) => VNodeKind::Text(text.clone()),
            VNodeKind::Component(comp) => VNodeKind::Component(VComponent {
                name: comp.name,
                key: comp.key.clone(),
                component: comp.component.clone(),
                handle: RefCell::new(RedrawHandle::new()),
            }),
        };

        VNode::new(kind)
    }
}

impl Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", self.kind())
            .field("mount", &self.inner.mount.get())
            .finish()
    }
}
