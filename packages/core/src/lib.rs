//! Trellis: retained-mode view reconciliation for any render surface.
//!
//! Application code describes what the UI should look like as a tree of [`VNode`]s. The [`VirtualDom`] keeps the
//! previously produced host tree in sync with that description through a [`RenderSurface`], reusing host nodes
//! where the shape allows, keeping component state alive across redraws and moving as few keyed children as
//! possible.

mod any_component;
mod arena;
mod builder;
mod diff;
mod error;
mod events;
mod headless;
mod nodes;
mod scheduler;
mod scopes;
mod surface;
mod virtual_dom;

pub(crate) mod innerlude {
    pub use crate::any_component::*;
    pub use crate::arena::*;
    pub use crate::builder::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::headless::*;
    pub use crate::nodes::*;
    pub use crate::scheduler::*;
    pub use crate::scopes::*;
    pub use crate::surface::*;
    pub use crate::virtual_dom::*;
}

pub use crate::innerlude::{
    component, component_with_state, fragment, h, text, AttributeValue, Attrs, BoxedGenerator,
    Child, ComponentBuilder, Cx, Element, ElementHooks, Error, Event, EventHandler, FrameCounter,
    FrameTiming, FrameToken, GeneratorFn, HandlerReturn, HeadlessSurface, HostKind, HostNode, Key, Mutation,
    NoFrames, NodeId, RedrawHandle, RedrawMode, RedrawTarget, RenderSurface, Result, Scheduler,
    ScopeId, State, VComponent, VElement, VFragment, VNode, VNodeKind, VText, VirtualDom,
};

/// The purpose of this module is to alleviate imports of many common types
pub mod prelude {
    pub use crate::innerlude::{
        component, component_with_state, fragment, h, text, Attrs, Child, Cx, Element, Event,
        EventHandler, FrameCounter, HeadlessSurface, Key, Mutation, NodeId, RedrawHandle,
        RedrawMode, RenderSurface, Scheduler, State, VNode, VirtualDom,
    };
}
