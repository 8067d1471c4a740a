//! Host events and the handlers views attach to them.

use std::{any::Any, fmt::Debug, rc::Rc};

/// An event delivered by the host to [`VirtualDom::dispatch_event`](crate::VirtualDom::dispatch_event).
#[derive(Clone)]
pub struct Event {
    name: String,
    data: Option<Rc<dyn Any>>,
}

impl Event {
    /// Create an event with no payload. The name is the bare event name, without an `on` prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    /// Attach a payload that handlers can read back with [`Event::data`].
    pub fn with_data<T: 'static>(mut self, data: T) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Downcast the payload.
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|data| data.downcast_ref::<T>())
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

/// What a handler or hook may return: nothing, or a `Result` whose error becomes the engine's callback error.
pub trait HandlerReturn {
    fn into_result(self) -> anyhow::Result<()>;
}

impl HandlerReturn for () {
    fn into_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E: Into<anyhow::Error>> HandlerReturn for Result<(), E> {
    fn into_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

/// A cheaply cloneable event callback stored in an element's attribute map.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<dyn Fn(&Event) -> anyhow::Result<()>>,
}

impl EventHandler {
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Event) -> R + 'static,
        R: HandlerReturn,
    {
        Self {
            callback: Rc::new(move |event: &Event| f(event).into_result()),
        }
    }

    pub(crate) fn call(&self, event: &Event) -> anyhow::Result<()> {
        (self.callback)(event)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventHandler")
    }
}
