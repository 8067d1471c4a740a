use crate::{
    arena::{NodeId, ScopeId},
    nodes::VNode,
    scheduler::{Scheduler, WeakScheduler},
};
use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::Rc,
};

/// A mounted component instance.
///
/// The engine keeps one `ScopeState` per live component identity. It owns the component's state and its last
/// generated output, and remembers where in the host tree that output lives.
pub(crate) struct ScopeState {
    /// The component view this instance was last reconciled with.
    pub(crate) vnode: VNode,

    /// A type-erased `State<S>`.
    pub(crate) state: Rc<dyn Any>,

    /// What the generator produced last time, after the copy rule.
    pub(crate) rendered: Option<VNode>,

    /// Stands in for the output while it produces no host nodes.
    pub(crate) placeholder: Option<NodeId>,

    pub(crate) parent: Option<ScopeId>,

    /// The host node the output is attached under.
    pub(crate) host_parent: NodeId,

    /// Distance from the root. Dirty scopes are redrawn in ascending height.
    pub(crate) height: u32,
}

impl ScopeState {
    pub(crate) fn name(&self) -> &'static str {
        self.vnode.as_component().map(|c| c.name()).unwrap_or("<root>")
    }
}

impl Debug for ScopeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeState")
            .field("name", &self.name())
            .field("parent", &self.parent)
            .field("host_parent", &self.host_parent)
            .field("height", &self.height)
            .field("placeholder", &self.placeholder)
            .finish()
    }
}

struct HandleInner {
    scope: Cell<Option<ScopeId>>,
    scheduler: RefCell<WeakScheduler>,
}

/// A stable way to ask for a component to be redrawn.
///
/// Every copy of one component identity shares the same handle: when a new component view is reconciled against an
/// old one, the old handle is moved onto the new view. Once the identity is discarded the handle resolves to nothing
/// and further requests are dropped.
#[derive(Clone)]
pub struct RedrawHandle {
    inner: Rc<HandleInner>,
}

impl RedrawHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(HandleInner {
                scope: Cell::new(None),
                scheduler: RefCell::new(WeakScheduler::default()),
            }),
        }
    }

    /// The component this handle currently resolves to.
    pub fn scope(&self) -> Option<ScopeId> {
        self.inner.scope.get()
    }

    pub fn is_live(&self) -> bool {
        self.scope().is_some()
    }

    /// Queue a redraw of the component. Returns `false` if the component is not mounted anymore (or not yet).
    ///
    /// Handles can be called from event handlers and hooks while the engine is busy. The request is picked up at the
    /// end of the current engine call in immediate mode, or at the next frame in batched mode.
    ///
    /// A handle only queues. Outside an engine call, an immediate-mode request waits for the next one: follow it
    /// with [`VirtualDom::flush`](crate::VirtualDom::flush), or call [`VirtualDom::redraw`](crate::VirtualDom::redraw)
    /// with the handle instead. [`VirtualDom::has_pending_redraws`](crate::VirtualDom::has_pending_redraws) tells
    /// whether anything is still waiting.
    pub fn request_redraw(&self) -> bool {
        let Some(scope) = self.scope() else {
            tracing::debug!("dropping redraw request for an unmounted component");
            return false;
        };
        let Some(scheduler) = self.inner.scheduler.borrow().upgrade() else {
            tracing::debug!(?scope, "dropping redraw request, the virtual dom is gone");
            return false;
        };
        scheduler.request(scope);
        true
    }

    pub fn ptr_eq(&self, other: &RedrawHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn bind(&self, scope: ScopeId, scheduler: &Scheduler) {
        self.inner.scope.set(Some(scope));
        *self.inner.scheduler.borrow_mut() = scheduler.downgrade();
    }

    pub(crate) fn clear(&self) {
        self.inner.scope.set(None);
        *self.inner.scheduler.borrow_mut() = WeakScheduler::default();
    }
}

impl Debug for RedrawHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RedrawHandle").field(&self.scope()).finish()
    }
}

/// Anything [`VirtualDom::redraw`](crate::VirtualDom::redraw) can be pointed at.
///
/// Component views and handles resolve to their own component. Other views resolve to the component that encloses
/// them.
pub trait RedrawTarget {
    fn redraw_scope(&self) -> Option<ScopeId>;
}

impl RedrawTarget for VNode {
    fn redraw_scope(&self) -> Option<ScopeId> {
        match self.as_component() {
            Some(comp) => comp.scope(),
            None => self.owner(),
        }
    }
}

impl RedrawTarget for RedrawHandle {
    fn redraw_scope(&self) -> Option<ScopeId> {
        self.scope()
    }
}

impl<T: RedrawTarget + ?Sized> RedrawTarget for &T {
    fn redraw_scope(&self) -> Option<ScopeId> {
        (**self).redraw_scope()
    }
}
