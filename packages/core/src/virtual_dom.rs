//! # Virtual DOM
//!
//! The entry point of the engine: mounting, re-rendering, redraw scheduling and event dispatch for one root.

use crate::{
    arena::{NodeId, ScopeId},
    events::{Event, EventHandler},
    nodes::{ElementHook, VNode},
    scheduler::{RedrawMode, Scheduler},
    scopes::{RedrawTarget, ScopeState},
    surface::RenderSurface,
    Error, Result,
};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

/// How many batches immediate mode drains in one engine call before leaving the rest for the next call.
const MAX_IMMEDIATE_PASSES: usize = 64;

/// A virtual node system that reconciles views into a [`RenderSurface`].
///
/// The `VirtualDom` owns the component instances, the listener registry and the redraw queue of one root. It does not
/// own the host tree: every change goes through the surface.
///
/// ## Guide
///
/// Views are plain values produced with [`h`](crate::h), [`text`](crate::text), [`fragment`](crate::fragment) and
/// [`component`](crate::component). Mount one as the root and the engine materializes it:
///
/// ```rust
/// use trellis_core::prelude::*;
///
/// #[derive(PartialEq)]
/// struct Props {
///     label: String,
/// }
///
/// fn counter(cx: &Cx<Props, i32>) -> Element {
///     let state = cx.state().clone();
///     let handle = cx.handle().clone();
///     Ok(h(
///         "button",
///         Attrs::new().on("click", move |_| {
///             *state.write() += 1;
///             handle.request_redraw();
///         }),
///         format!("{}: {}", cx.props().label, cx.state().read()),
///     )?)
/// }
///
/// let mut dom = VirtualDom::with_scheduler(HeadlessSurface::new(), Scheduler::immediate());
/// let root = dom.surface().root();
/// dom.mount(root, component(counter, Props { label: "clicks".into() }).build())?;
///
/// let button = dom.surface().children(root)[0];
/// dom.dispatch_event(button, &Event::new("click"))?;
/// assert_eq!(dom.surface().text_content(root), "clicks: 1");
/// # Ok::<(), trellis_core::Error>(())
/// ```
///
/// ## Redraws
///
/// Components are redrawn when their props change during a parent's reconciliation, or when something asks for it
/// through [`VirtualDom::redraw`], a [`RedrawHandle`](crate::RedrawHandle) or an event handler. In batched mode the
/// host must call [`VirtualDom::flush`] when the requested frame arrives.
pub struct VirtualDom<R: RenderSurface> {
    pub(crate) surface: R,

    pub(crate) scopes: SlotMap<ScopeId, ScopeState>,

    pub(crate) listeners: FxHashMap<NodeId, ListenerEntry>,

    pub(crate) scheduler: Scheduler,

    root: Option<MountedRoot>,

    // Components already regenerated in the current pass. Queued redraws for them are skipped.
    pub(crate) rendered_this_pass: FxHashSet<ScopeId>,

    // Mount hooks collected while creating nodes, run once the pass has attached everything.
    pub(crate) pending_mounts: Vec<PendingMount>,
}

struct MountedRoot {
    parent: NodeId,
    view: VNode,
    // Views a failed render left half reconciled. They may still own host nodes.
    stale: Vec<VNode>,
}

/// The handlers attached to one host node.
#[derive(Default)]
pub(crate) struct ListenerEntry {
    /// The component enclosing the element. Handled events redraw it.
    pub(crate) owner: Option<ScopeId>,
    pub(crate) handlers: FxHashMap<String, EventHandler>,
}

pub(crate) enum PendingMount {
    Element { node: NodeId, tag: String, hook: ElementHook },
    Component(ScopeId),
}

impl<R: RenderSurface> VirtualDom<R> {
    /// Create a virtual dom over `surface` with a batched scheduler that never fires on its own.
    ///
    /// Use [`VirtualDom::with_scheduler`] to hook up the host's frame clock or to run in immediate mode.
    pub fn new(surface: R) -> Self {
        Self::with_scheduler(surface, Scheduler::default())
    }

    pub fn with_scheduler(surface: R, scheduler: Scheduler) -> Self {
        Self {
            surface,
            scopes: SlotMap::with_key(),
            listeners: FxHashMap::default(),
            scheduler,
            root: None,
            rendered_this_pass: FxHashSet::default(),
            pending_mounts: Vec::new(),
        }
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The view currently mounted as the root.
    pub fn root_view(&self) -> Option<&VNode> {
        self.root.as_ref().map(|root| &root.view)
    }

    /// Number of live component instances.
    pub fn component_count(&self) -> usize {
        self.scopes.len()
    }

    /// Materialize `view` and append it under `parent`.
    pub fn mount(&mut self, parent: NodeId, view: VNode) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::AlreadyMounted);
        }

        tracing::debug!(?parent, "mounting root");
        let view = view.adopt();
        self.begin_pass();

        let nodes = self.create_node(&view, parent, None)?;
        for node in nodes {
            self.surface.insert_before(parent, node, None);
        }
        self.root = Some(MountedRoot {
            parent,
            view,
            stale: Vec::new(),
        });

        self.finish_pass()?;
        self.drain_immediate()
    }

    /// Reconcile the mounted root against a new view.
    ///
    /// If this fails the surface may be left partially updated. The root stays mounted, and [`VirtualDom::unmount`]
    /// still removes everything it put on the surface.
    pub fn render(&mut self, view: VNode) -> Result<()> {
        let (parent, old) = match &self.root {
            Some(root) => (root.parent, root.view.clone()),
            None => return Err(Error::NotMounted),
        };
        if old.ptr_eq(&view) {
            return Ok(());
        }

        let new = view.adopt();
        self.begin_pass();

        let anchor = self.next_sibling_of(&old);
        let diffed = self.diff_children(
            parent,
            &[Some(old.clone())],
            &[Some(new.clone())],
            anchor,
            None,
        );
        if let Some(root) = self.root.as_mut() {
            root.view = new;
            if diffed.is_err() {
                tracing::debug!("render failed, keeping the previous root view for teardown");
                root.stale.push(old);
            }
        }
        diffed?;

        self.finish_pass()?;
        self.drain_immediate()
    }

    /// Tear the root down: run every unmount hook, drop every component and remove the root's host nodes.
    pub fn unmount(&mut self) -> Result<()> {
        let root = self.root.take().ok_or(Error::NotMounted)?;
        tracing::debug!(parent = ?root.parent, "unmounting root");

        let mut removed = self.remove_slot(&root.view);
        for stale in &root.stale {
            let result = self.remove_slot(stale);
            removed = removed.and(result);
        }
        removed
    }

    /// Reconcile `old` into `new` under `parent` and return the first host node `new` now owns.
    ///
    /// `old = None` creates `new` and appends it to `parent`; `new = None` tears `old` down. This is the primitive
    /// [`VirtualDom::mount`] and [`VirtualDom::render`] are built on. It does not touch the mounted root.
    pub fn reconcile(
        &mut self,
        old: Option<&VNode>,
        new: Option<&VNode>,
        parent: NodeId,
    ) -> Result<Option<NodeId>> {
        self.begin_pass();

        let anchor = old.and_then(|old| self.next_sibling_of(old));
        self.diff_children(parent, &[old.cloned()], &[new.cloned()], anchor, None)?;

        self.finish_pass()?;
        self.drain_immediate()?;
        Ok(new.and_then(|new| self.first_host_node(new)))
    }

    /// Ask for the component nearest to `target` to be redrawn.
    ///
    /// Component views and handles target their own component, other views the component that encloses them. In
    /// immediate mode the redraw happens before this returns, in batched mode it waits for [`VirtualDom::flush`].
    /// Targets that are not (or no longer) mounted are ignored.
    pub fn redraw(&mut self, target: impl RedrawTarget) -> Result<()> {
        let Some(scope) = target.redraw_scope() else {
            tracing::debug!("dropping redraw request for a view without a component");
            return Ok(());
        };
        if !self.scopes.contains_key(scope) {
            tracing::debug!(?scope, "dropping redraw request for a discarded component");
            return Ok(());
        }

        self.scheduler.request(scope);
        self.drain_immediate()
    }

    /// Regenerate every component queued since the last flush.
    ///
    /// Hosts call this when the frame requested through [`FrameTiming`](crate::FrameTiming) fires. Requests made
    /// while the batch is drained are queued for the next frame.
    pub fn flush(&mut self) -> Result<()> {
        let batch = self.scheduler.take_batch();
        self.run_batch(batch.into_iter().collect())?;
        self.drain_immediate()
    }

    /// Whether any redraw is waiting for a flush.
    pub fn has_pending_redraws(&self) -> bool {
        self.scheduler.queued() > 0
    }

    /// Deliver a host event to the handler registered for it on `node`.
    ///
    /// Returns `false` if nothing listens for the event there. After the handler ran, the component enclosing the
    /// element is queued for a redraw.
    pub fn dispatch_event(&mut self, node: NodeId, event: &Event) -> Result<bool> {
        let Some(entry) = self.listeners.get(&node) else {
            return Ok(false);
        };
        let Some(handler) = entry.handlers.get(event.name()).cloned() else {
            return Ok(false);
        };
        let owner = entry.owner;

        tracing::trace!(?node, event = event.name(), "dispatching event");
        handler.call(event).map_err(|source| Error::Handler {
            event: event.name().to_string(),
            source,
        })?;

        if let Some(owner) = owner.filter(|owner| self.scopes.contains_key(*owner)) {
            self.scheduler.request(owner);
        }

        self.drain_immediate()?;
        Ok(true)
    }

    // Mount hooks left over from a failed pass refer to nodes that never made it onto the surface
    fn begin_pass(&mut self) {
        self.rendered_this_pass.clear();
        self.pending_mounts.clear();
    }

    fn run_batch(&mut self, batch: Vec<ScopeId>) -> Result<()> {
        self.begin_pass();

        let mut dirty: Vec<(u32, ScopeId)> = batch
            .into_iter()
            .filter_map(|scope| match self.scopes.get(scope) {
                Some(state) => Some((state.height, scope)),
                None => {
                    tracing::debug!(?scope, "dropping stale redraw");
                    None
                }
            })
            .collect();

        if dirty.is_empty() {
            return Ok(());
        }

        // parents first, so a child regenerated by its parent is not regenerated twice
        dirty.sort_by_key(|(height, _)| *height);
        tracing::debug!(count = dirty.len(), "flushing redraw batch");

        for (_, scope) in dirty {
            if !self.scopes.contains_key(scope) {
                tracing::debug!(?scope, "component was discarded earlier in this batch");
                continue;
            }
            if self.rendered_this_pass.contains(&scope) {
                tracing::trace!(?scope, "already regenerated in this pass");
                continue;
            }
            self.rerender_scope(scope)?;
        }

        self.finish_pass()
    }

    fn drain_immediate(&mut self) -> Result<()> {
        if self.scheduler.mode() != RedrawMode::Immediate {
            return Ok(());
        }

        for _ in 0..MAX_IMMEDIATE_PASSES {
            let batch = self.scheduler.take_batch();
            if batch.is_empty() {
                return Ok(());
            }
            self.run_batch(batch.into_iter().collect())?;
        }

        tracing::warn!("redraw requests keep arriving, leaving the rest for the next call");
        Ok(())
    }
}
