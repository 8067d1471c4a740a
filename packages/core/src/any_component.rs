use crate::{
    events::HandlerReturn,
    nodes::{Key, VComponent, VNode, VNodeKind},
    scopes::RedrawHandle,
};
use std::{
    any::Any,
    cell::{Ref, RefCell, RefMut},
    fmt::Debug,
    rc::Rc,
};

/// What a component generator returns.
pub type Element = anyhow::Result<VNode>;

/// Component-local state, shared between the engine and the callbacks a generator hands out.
///
/// The engine creates the state once when the component identity is first mounted and keeps it until the identity
/// is discarded. Cloning a `State` clones the handle, not the value.
pub struct State<S>(Rc<RefCell<S>>);

impl<S> State<S> {
    pub(crate) fn new(value: S) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn read(&self) -> Ref<'_, S> {
        self.0.borrow()
    }

    pub fn write(&self) -> RefMut<'_, S> {
        self.0.borrow_mut()
    }

    pub fn set(&self, value: S) {
        *self.0.borrow_mut() = value;
    }

    pub fn with_mut<O>(&self, f: impl FnOnce(&mut S) -> O) -> O {
        f(&mut self.0.borrow_mut())
    }
}

impl<S: Clone> State<S> {
    pub fn get(&self) -> S {
        self.0.borrow().clone()
    }
}

impl<S> Clone for State<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: Debug> Debug for State<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("State").field(&self.0.borrow()).finish()
    }
}

/// Everything a generator or component hook can see: the current props, the persistent state and the redraw handle.
pub struct Cx<'a, P, S> {
    props: &'a P,
    state: &'a State<S>,
    handle: &'a RedrawHandle,
}

impl<'a, P, S> Cx<'a, P, S> {
    pub fn props(&self) -> &'a P {
        self.props
    }

    pub fn state(&self) -> &'a State<S> {
        self.state
    }

    /// The handle of this component identity. It stays valid across redraws and resolves to nothing once the
    /// component is unmounted.
    pub fn handle(&self) -> &'a RedrawHandle {
        self.handle
    }

    /// Shorthand for `cx.handle().request_redraw()`.
    pub fn request_redraw(&self) {
        self.handle.request_redraw();
    }
}

type Gate<P, S> = Rc<dyn Fn(&P, &P, &S) -> bool>;
type Hook<P, S> = Rc<dyn Fn(&Cx<P, S>) -> anyhow::Result<()>>;

/// A generator behind a function pointer.
pub type GeneratorFn<P, S> = fn(&Cx<P, S>) -> Element;

/// A boxed generator, for tables of generators picked at runtime.
pub type BoxedGenerator<P, S> = Box<dyn Fn(&Cx<P, S>) -> Element>;

/// Whether two generators of the same type are the same generator.
///
/// A fn item or closure type names exactly one generator, so the type decides. Function pointers and trait objects
/// erase it and are compared by address instead.
fn same_generator<F, P, S>(a: &F, b: &F) -> bool
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: 'static,
    S: 'static,
{
    if std::mem::size_of::<F>() == 0 {
        return true;
    }

    let (a, b) = (a as &dyn Any, b as &dyn Any);
    if let (Some(a), Some(b)) = (
        a.downcast_ref::<GeneratorFn<P, S>>(),
        b.downcast_ref::<GeneratorFn<P, S>>(),
    ) {
        return *a as usize == *b as usize;
    }
    if let (Some(a), Some(b)) = (
        a.downcast_ref::<BoxedGenerator<P, S>>(),
        b.downcast_ref::<BoxedGenerator<P, S>>(),
    ) {
        return same_object(&**a, &**b);
    }
    if let (Some(a), Some(b)) = (
        a.downcast_ref::<&'static dyn Fn(&Cx<P, S>) -> Element>(),
        b.downcast_ref::<&'static dyn Fn(&Cx<P, S>) -> Element>(),
    ) {
        return same_object(*a, *b);
    }

    true
}

// Address and vtable: boxed zero-sized generators share an address but not a vtable.
#[allow(ambiguous_wide_pointer_comparisons)]
fn same_object<P, S>(
    a: &dyn Fn(&Cx<P, S>) -> Element,
    b: &dyn Fn(&Cx<P, S>) -> Element,
) -> bool {
    std::ptr::eq(a, b)
}

/// A type-erased component: generator, props and hooks behind one vtable.
pub(crate) trait AnyComponent: 'static {
    fn as_any(&self) -> &dyn Any;

    /// Whether `other` was built from the same generator. Two components with the same generator are the same
    /// component.
    fn same_generator(&self, other: &dyn AnyComponent) -> bool;

    fn name(&self) -> &'static str;

    fn props_any(&self) -> &dyn Any;

    /// Create the state for a fresh identity. The returned value is a `State<S>`.
    fn init_state(&self) -> Rc<dyn Any>;

    /// Decide whether moving from `old`'s props to ours needs a regeneration.
    fn should_update(&self, old: &dyn AnyComponent, state: &dyn Any) -> bool;

    fn render(&self, state: &dyn Any, handle: &RedrawHandle) -> Element;

    fn has_mount_hook(&self) -> bool;

    fn mounted(&self, state: &dyn Any, handle: &RedrawHandle) -> anyhow::Result<()>;

    fn unmounted(&self, state: &dyn Any, handle: &RedrawHandle) -> anyhow::Result<()>;
}

pub(crate) struct VProps<F, P, S> {
    render_fn: F,
    props: P,
    name: &'static str,
    init: Rc<dyn Fn(&P) -> S>,
    gate: Gate<P, S>,
    on_mount: Option<Hook<P, S>>,
    on_unmount: Option<Hook<P, S>>,
}

impl<F, P, S> VProps<F, P, S>
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: 'static,
    S: 'static,
{
    fn with_cx<O>(
        &self,
        state: &dyn Any,
        handle: &RedrawHandle,
        f: impl FnOnce(&Cx<P, S>) -> anyhow::Result<O>,
    ) -> anyhow::Result<O> {
        let state = state
            .downcast_ref::<State<S>>()
            .ok_or_else(|| anyhow::anyhow!("state of `{}` has an unexpected type", self.name))?;
        f(&Cx {
            props: &self.props,
            state,
            handle,
        })
    }
}

impl<F, P, S> AnyComponent for VProps<F, P, S>
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: 'static,
    S: 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_generator(&self, other: &dyn AnyComponent) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(other) => same_generator::<F, P, S>(&self.render_fn, &other.render_fn),
            None => false,
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn props_any(&self) -> &dyn Any {
        &self.props
    }

    fn init_state(&self) -> Rc<dyn Any> {
        Rc::new(State::new((self.init)(&self.props)))
    }

    fn should_update(&self, old: &dyn AnyComponent, state: &dyn Any) -> bool {
        let (Some(old), Some(state)) = (
            old.props_any().downcast_ref::<P>(),
            state.downcast_ref::<State<S>>(),
        ) else {
            return true;
        };
        let state = state.read();
        (self.gate)(old, &self.props, &state)
    }

    fn render(&self, state: &dyn Any, handle: &RedrawHandle) -> Element {
        self.with_cx(state, handle, |cx| (self.render_fn)(cx))
    }

    fn has_mount_hook(&self) -> bool {
        self.on_mount.is_some()
    }

    fn mounted(&self, state: &dyn Any, handle: &RedrawHandle) -> anyhow::Result<()> {
        match &self.on_mount {
            Some(hook) => self.with_cx(state, handle, |cx| hook(cx)),
            None => Ok(()),
        }
    }

    fn unmounted(&self, state: &dyn Any, handle: &RedrawHandle) -> anyhow::Result<()> {
        match &self.on_unmount {
            Some(hook) => self.with_cx(state, handle, |cx| hook(cx)),
            None => Ok(()),
        }
    }
}

/// Create a component view whose state starts at `S::default()`.
///
/// The generator is the component's identity: reconciling two component views built from the same generator keeps the
/// state and the redraw handle of the old one. A fn item or closure is identified by its type, so a closure rebuilt on
/// every render is still the same generator. Function pointers and [`BoxedGenerator`]s are identified by address.
///
/// ```rust
/// use trellis_core::prelude::*;
///
/// #[derive(PartialEq)]
/// struct Greeting {
///     name: String,
/// }
///
/// fn greeting(cx: &Cx<Greeting, ()>) -> Element {
///     Ok(h("p", Attrs::new(), format!("hello {}", cx.props().name))?)
/// }
///
/// let view = component(greeting, Greeting { name: "world".into() }).build();
/// ```
pub fn component<F, P, S>(render_fn: F, props: P) -> ComponentBuilder<F, P, S>
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: PartialEq + 'static,
    S: Default + 'static,
{
    component_with_state(render_fn, props, |_| S::default())
}

/// Create a component view whose state is derived from its first props.
pub fn component_with_state<F, P, S>(
    render_fn: F,
    props: P,
    init: impl Fn(&P) -> S + 'static,
) -> ComponentBuilder<F, P, S>
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: PartialEq + 'static,
    S: 'static,
{
    ComponentBuilder {
        key: None,
        props: VProps {
            render_fn,
            props,
            name: std::any::type_name::<F>(),
            init: Rc::new(init),
            gate: Rc::new(|old: &P, new: &P, _: &S| old != new),
            on_mount: None,
            on_unmount: None,
        },
    }
}

/// A component view under construction.
pub struct ComponentBuilder<F, P, S> {
    key: Option<Key>,
    props: VProps<F, P, S>,
}

impl<F, P, S> ComponentBuilder<F, P, S>
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: 'static,
    S: 'static,
{
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the default equality gate. The gate receives the old props, the new props and the current state and
    /// returns whether the component must regenerate.
    pub fn should_update(mut self, gate: impl Fn(&P, &P, &S) -> bool + 'static) -> Self {
        self.props.gate = Rc::new(gate);
        self
    }

    /// Run `hook` once after the component's output is first attached to the render tree.
    pub fn on_mount<R: HandlerReturn>(mut self, hook: impl Fn(&Cx<P, S>) -> R + 'static) -> Self {
        self.props.on_mount = Some(Rc::new(move |cx: &Cx<P, S>| hook(cx).into_result()));
        self
    }

    /// Run `hook` once before the component's output is torn down.
    pub fn on_unmount<R: HandlerReturn>(
        mut self,
        hook: impl Fn(&Cx<P, S>) -> R + 'static,
    ) -> Self {
        self.props.on_unmount = Some(Rc::new(move |cx: &Cx<P, S>| hook(cx).into_result()));
        self
    }

    /// Finish the view. Every built component view carries a fresh redraw handle.
    pub fn build(self) -> VNode {
        VNode::new(VNodeKind::Component(VComponent {
            name: self.props.name,
            key: self.key,
            component: Rc::new(self.props),
            handle: RefCell::new(RedrawHandle::new()),
        }))
    }
}
