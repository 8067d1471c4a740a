//! # Redraw scheduling
//!
//! Components ask to be redrawn through their [`RedrawHandle`](crate::RedrawHandle) or through
//! [`VirtualDom::redraw`](crate::VirtualDom::redraw). Every request lands in a deduplicated queue owned by the
//! [`Scheduler`].
//!
//! In [`RedrawMode::Batched`] (the default) the first request after an idle period asks the host for a frame through
//! [`FrameTiming`]. Further requests pile up in the queue without asking again. When the frame fires, the host calls
//! [`VirtualDom::flush`](crate::VirtualDom::flush), which takes the whole queue at once and regenerates the dirty
//! components parents first. Requests raised while the queue is being drained go into a fresh queue and wait for
//! the next frame.
//!
//! In [`RedrawMode::Immediate`] no frames are requested. The engine drains the queue before returning from whatever
//! call raised the request.
//!
//! The mode can only be chosen before the first request. After that the queue may hold work that was scheduled
//! under the old mode, so [`Scheduler::set_mode`] refuses with [`Error::ModeLocked`].

use crate::{arena::ScopeId, Error, Result};
use indexmap::IndexSet;
use std::{
    cell::RefCell,
    fmt::Debug,
    rc::{Rc, Weak},
};

/// How redraw requests are turned into reconciliation passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RedrawMode {
    /// Reconcile before returning from the call that requested the redraw.
    Immediate,

    /// Coalesce requests until the next frame.
    #[default]
    Batched,
}

/// An opaque token identifying one requested frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// The host's frame clock.
///
/// `request_frame` only registers interest. The host is expected to call
/// [`VirtualDom::flush`](crate::VirtualDom::flush) once the frame arrives.
pub trait FrameTiming {
    fn request_frame(&mut self) -> FrameToken;
}

/// A frame clock that hands out tokens and nothing else. Useful for hosts that call `flush` on their own schedule.
#[derive(Debug, Default)]
pub struct NoFrames {
    next: u64,
}

impl FrameTiming for NoFrames {
    fn request_frame(&mut self) -> FrameToken {
        self.next += 1;
        FrameToken(self.next)
    }
}

pub(crate) struct SchedulerInner {
    mode: RedrawMode,
    locked: bool,
    queue: IndexSet<ScopeId>,
    pending_frame: Option<FrameToken>,
    frames: Box<dyn FrameTiming>,
}

/// The redraw queue of one root.
///
/// Cloning a `Scheduler` clones a handle to the same queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Scheduler {
    /// A batched scheduler driven by `frames`.
    pub fn new(frames: impl FrameTiming + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                mode: RedrawMode::Batched,
                locked: false,
                queue: IndexSet::new(),
                pending_frame: None,
                frames: Box::new(frames),
            })),
        }
    }

    /// A scheduler in immediate mode.
    pub fn immediate() -> Self {
        let scheduler = Self::new(NoFrames::default());
        scheduler.inner.borrow_mut().mode = RedrawMode::Immediate;
        scheduler
    }

    pub fn mode(&self) -> RedrawMode {
        self.inner.borrow().mode
    }

    /// Change the redraw mode. Only allowed before the first redraw request.
    pub fn set_mode(&self, mode: RedrawMode) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.locked {
            if inner.mode != mode {
                tracing::warn!(current = ?inner.mode, requested = ?mode, "redraw mode is locked");
            }
            return Err(Error::ModeLocked);
        }
        inner.mode = mode;
        Ok(())
    }

    /// Whether the first redraw request already happened.
    pub fn is_locked(&self) -> bool {
        self.inner.borrow().locked
    }

    /// The frame requested for the current batch, if one is outstanding.
    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.inner.borrow().pending_frame
    }

    /// Number of distinct components waiting for a redraw.
    pub fn queued(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub(crate) fn request(&self, scope: ScopeId) {
        let mut inner = self.inner.borrow_mut();
        inner.locked = true;

        if !inner.queue.insert(scope) {
            tracing::trace!(?scope, "redraw already queued");
            return;
        }

        if inner.mode == RedrawMode::Batched && inner.pending_frame.is_none() {
            let token = inner.frames.request_frame();
            tracing::trace!(?token, "requested frame");
            inner.pending_frame = Some(token);
        }
    }

    /// Swap the queue out and clear the pending frame so new requests schedule the next one.
    pub(crate) fn take_batch(&self) -> IndexSet<ScopeId> {
        let mut inner = self.inner.borrow_mut();
        inner.pending_frame = None;
        std::mem::take(&mut inner.queue)
    }

    pub(crate) fn downgrade(&self) -> WeakScheduler {
        WeakScheduler(Rc::downgrade(&self.inner))
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(NoFrames::default())
    }
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("mode", &inner.mode)
            .field("locked", &inner.locked)
            .field("queue", &inner.queue)
            .field("pending_frame", &inner.pending_frame)
            .finish()
    }
}

/// A scheduler reference held by redraw handles. It does not keep the root alive.
#[derive(Clone, Default)]
pub(crate) struct WeakScheduler(Weak<RefCell<SchedulerInner>>);

impl WeakScheduler {
    pub(crate) fn upgrade(&self) -> Option<Scheduler> {
        self.0.upgrade().map(|inner| Scheduler { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[derive(Default)]
    struct Counting(Rc<std::cell::Cell<u64>>);

    impl FrameTiming for Counting {
        fn request_frame(&mut self) -> FrameToken {
            self.0.set(self.0.get() + 1);
            FrameToken(self.0.get())
        }
    }

    #[test]
    fn requests_coalesce_into_one_frame() {
        let frames = Rc::new(std::cell::Cell::new(0));
        let scheduler = Scheduler::new(Counting(frames.clone()));
        let mut ids = SlotMap::<ScopeId, ()>::with_key();
        let a = ids.insert(());
        let b = ids.insert(());

        scheduler.request(a);
        scheduler.request(b);
        scheduler.request(a);

        assert_eq!(frames.get(), 1);
        assert_eq!(scheduler.queued(), 2);
        assert_eq!(scheduler.pending_frame(), Some(FrameToken(1)));

        let batch = scheduler.take_batch();
        assert_eq!(batch.into_iter().collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(scheduler.pending_frame(), None);

        scheduler.request(b);
        assert_eq!(frames.get(), 2);
    }

    #[test]
    fn mode_locks_after_first_request() {
        let scheduler = Scheduler::default();
        scheduler.set_mode(RedrawMode::Immediate).unwrap();
        scheduler.set_mode(RedrawMode::Batched).unwrap();

        let mut ids = SlotMap::<ScopeId, ()>::with_key();
        scheduler.request(ids.insert(()));

        assert!(scheduler.is_locked());
        assert!(matches!(
            scheduler.set_mode(RedrawMode::Immediate),
            Err(Error::ModeLocked)
        ));
    }

    #[test]
    fn immediate_mode_never_asks_for_frames() {
        let scheduler = Scheduler::immediate();
        let mut ids = SlotMap::<ScopeId, ()>::with_key();
        scheduler.request(ids.insert(()));
        assert_eq!(scheduler.pending_frame(), None);
        assert_eq!(scheduler.queued(), 1);
    }
}
