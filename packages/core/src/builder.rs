//! Helpers for building views.
//!
//! [`h`] builds an element from a selector, an attribute set and whatever children the call site has at hand.
//! Children go through [`Child`], which turns strings, numbers, options, booleans, lists and other views into one
//! normalized child list:
//!
//! ```rust
//! use trellis_core::prelude::*;
//!
//! let items = vec!["a", "b"];
//! let list = h(
//!     "ul#todos.list",
//!     Attrs::new(),
//!     items
//!         .iter()
//!         .map(|item| h("li", Attrs::new().key(*item), *item))
//!         .collect::<Result<Vec<_>, _>>()?,
//! )?;
//! # Ok::<(), trellis_core::Error>(())
//! ```

use crate::{
    any_component::{ComponentBuilder, Cx, Element},
    arena::NodeId,
    events::{EventHandler, HandlerReturn},
    nodes::{
        AttributeValue, ElementHooks, Key, VElement, VFragment, VNode, VNodeKind, VText,
    },
    Error, Result,
};
use rustc_hash::FxHashSet;
use std::{collections::BTreeMap, rc::Rc};

const DEFAULT_TAG: &str = "div";

/// Whatever can sit in a child position.
///
/// The top level of a `Child` is the child list itself. Lists nested inside it become fragments.
pub enum Child {
    Absent,
    Text(String),
    Node(VNode),
    List(Vec<Child>),
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Text(text.clone())
    }
}

macro_rules! child_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

child_from_display!(char, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

/// Booleans are absent slots, so `cond && ...`-style children have somewhere to go.
impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Absent
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Absent
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Absent, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Child>, const N: usize> From<[T; N]> for Child {
    fn from(items: [T; N]) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

impl<F, P, S> From<ComponentBuilder<F, P, S>> for Child
where
    F: Fn(&Cx<P, S>) -> Element + 'static,
    P: 'static,
    S: 'static,
{
    fn from(builder: ComponentBuilder<F, P, S>) -> Self {
        Child::Node(builder.build())
    }
}

/// The attribute side of [`h`]: key, id, classes, attributes, listeners and element hooks.
#[derive(Clone, Default, Debug)]
pub struct Attrs {
    key: Option<Key>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, AttributeValue>,
    hooks: ElementHooks,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Overrides an id given in the selector.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add one or more whitespace separated classes.
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        self.classes
            .extend(class.as_ref().split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute. `id` and `class` are routed to [`Attrs::id`] and [`Attrs::class`].
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let name = name.into();
        match value.into() {
            AttributeValue::Text(id) if name == "id" => self.id(id),
            AttributeValue::Text(class) if name == "class" => self.class(class),
            value => {
                self.attrs.insert(name, value);
                self
            }
        }
    }

    /// Listen for `event` (without the `on` prefix). The handler is stored as the `on{event}` attribute.
    pub fn on<F, R>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(&crate::Event) -> R + 'static,
        R: HandlerReturn,
    {
        self.attrs.insert(
            format!("on{event}"),
            AttributeValue::Listener(EventHandler::new(handler)),
        );
        self
    }

    /// Run `hook` with the element's host node once it is attached.
    pub fn on_mount<R: HandlerReturn>(mut self, hook: impl Fn(NodeId) -> R + 'static) -> Self {
        self.hooks.on_mount = Some(Rc::new(move |node: NodeId| hook(node).into_result()));
        self
    }

    /// Run `hook` with the element's host node before it is discarded.
    pub fn on_unmount<R: HandlerReturn>(mut self, hook: impl Fn(NodeId) -> R + 'static) -> Self {
        self.hooks.on_unmount = Some(Rc::new(move |node: NodeId| hook(node).into_result()));
        self
    }
}

/// Build an element.
///
/// `selector` is `tag#id.class.class`: the bare prefix is the tag (`div` when empty), the first `#` token the id
/// and every `.` token a class. Anything else fails with [`Error::InvalidSelector`]. Duplicate keys among the
/// (fragment-flattened) children fail with [`Error::DuplicateKey`].
pub fn h(selector: &str, attrs: Attrs, children: impl Into<Child>) -> Result<VNode> {
    let parsed = parse_selector(selector)?;
    let children = normalize(children.into());
    ensure_unique_keys(&children)?;

    let Attrs {
        key,
        id,
        classes,
        attrs,
        hooks,
    } = attrs;

    let mut all_classes = parsed.classes;
    for class in classes {
        if !all_classes.contains(&class) {
            all_classes.push(class);
        }
    }

    Ok(VNode::new(VNodeKind::Element(VElement {
        tag: parsed.tag,
        id: id.or(parsed.id),
        classes: all_classes,
        attrs,
        key,
        children,
        hooks,
    })))
}

/// Build a text view.
pub fn text(text: impl Into<String>) -> VNode {
    VNode::new(VNodeKind::Text(VText { text: text.into() }))
}

/// Build a fragment. Nested lists become nested fragments.
pub fn fragment(children: impl Into<Child>) -> Result<VNode> {
    let children = normalize(children.into());
    ensure_unique_keys(&children)?;
    Ok(VNode::new(VNodeKind::Fragment(VFragment { children })))
}

fn normalize(children: Child) -> Vec<Option<VNode>> {
    match children {
        Child::List(items) => items.into_iter().map(into_slot).collect(),
        other => vec![into_slot(other)],
    }
}

fn into_slot(child: Child) -> Option<VNode> {
    match child {
        Child::Absent => None,
        Child::Text(s) => Some(text(s).adopt()),
        Child::Node(node) => Some(node.adopt()),
        Child::List(items) => {
            let children = items.into_iter().map(into_slot).collect();
            Some(VNode::new(VNodeKind::Fragment(VFragment { children })).adopt())
        }
    }
}

/// Fail with the first key that appears twice in the flattened child list.
pub(crate) fn ensure_unique_keys(children: &[Option<VNode>]) -> Result<()> {
    fn walk(children: &[Option<VNode>], seen: &mut FxHashSet<Key>) -> Result<()> {
        for child in children.iter().flatten() {
            if let VNodeKind::Fragment(frag) = child.kind() {
                walk(&frag.children, seen)?;
            } else if let Some(key) = child.key() {
                if !seen.insert(key.clone()) {
                    return Err(Error::DuplicateKey { key: key.clone() });
                }
            }
        }
        Ok(())
    }

    walk(children, &mut FxHashSet::default())
}

#[derive(Debug, PartialEq)]
struct Selector {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
}

fn parse_selector(selector: &str) -> Result<Selector> {
    let invalid = |reason| Error::InvalidSelector {
        selector: selector.to_string(),
        reason,
    };

    if selector.chars().any(char::is_whitespace) {
        return Err(invalid("selectors cannot contain whitespace"));
    }

    let mut parsed = Selector {
        tag: String::new(),
        id: None,
        classes: Vec::new(),
    };

    let mut sigil = None;
    let mut start = 0;
    let boundaries = selector
        .match_indices(['#', '.'])
        .map(|(idx, s)| (idx, s.chars().next()))
        .chain(std::iter::once((selector.len(), None)));

    for (end, next) in boundaries {
        let token = &selector[start..end];
        if !token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        {
            return Err(invalid("unexpected character"));
        }

        match sigil {
            None => parsed.tag = token.to_string(),
            Some(_) if token.is_empty() => return Err(invalid("empty id or class token")),
            Some('#') if parsed.id.is_none() => parsed.id = Some(token.to_string()),
            Some('#') => {}
            Some(_) => parsed.classes.push(token.to_string()),
        }

        sigil = next;
        start = end + 1;
    }

    if parsed.tag.is_empty() {
        parsed.tag = DEFAULT_TAG.to_string();
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(tag: &str, id: Option<&str>, classes: &[&str]) -> Selector {
        Selector {
            tag: tag.to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn selectors() {
        assert_eq!(parse_selector("span").unwrap(), sel("span", None, &[]));
        assert_eq!(parse_selector("").unwrap(), sel("div", None, &[]));
        assert_eq!(
            parse_selector("#main.a.b").unwrap(),
            sel("div", Some("main"), &["a", "b"])
        );
        assert_eq!(
            parse_selector("li.item#x.done").unwrap(),
            sel("li", Some("x"), &["item", "done"])
        );
        assert_eq!(
            parse_selector("p#first#second").unwrap(),
            sel("p", Some("first"), &[])
        );
    }

    #[test]
    fn malformed_selectors() {
        for bad in ["div.", "div#", "a..b", "my div", "div!", "p.x y"] {
            assert!(
                matches!(parse_selector(bad), Err(Error::InvalidSelector { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn nested_lists_become_fragments() {
        let children = normalize(Child::from(vec![
            Child::from("a"),
            Child::from(false),
            Child::from(vec!["b", "c"]),
            Child::from(None::<&str>),
        ]));

        assert_eq!(children.len(), 4);
        assert!(matches!(children[0].as_ref().map(|c| c.kind()), Some(VNodeKind::Text(_))));
        assert!(children[1].is_none());
        match children[2].as_ref().map(|c| c.kind()) {
            Some(VNodeKind::Fragment(frag)) => assert_eq!(frag.children.len(), 2),
            other => panic!("expected a fragment, got {other:?}"),
        }
        assert!(children[3].is_none());
    }

    #[test]
    fn reused_views_are_copied() {
        let shared = h("span", Attrs::new(), "x").unwrap();
        let first = h("div", Attrs::new(), shared.clone()).unwrap();
        let second = h("div", Attrs::new(), shared.clone()).unwrap();

        let first_child = first.as_element().unwrap().children[0].clone().unwrap();
        let second_child = second.as_element().unwrap().children[0].clone().unwrap();

        assert!(first_child.ptr_eq(&shared));
        assert!(!second_child.ptr_eq(&shared));
        assert_eq!(second_child.as_element().unwrap().tag, "span");
    }

    #[test]
    fn duplicate_keys_across_fragments() {
        let err = h(
            "ul",
            Attrs::new(),
            vec![
                Child::from(h("li", Attrs::new().key(1), "a").unwrap()),
                Child::from(vec![h("li", Attrs::new().key(1), "b").unwrap()]),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { key: Key::Int(1) }));
    }

    #[test]
    fn attrs_merge_with_selector() {
        let node = h(
            "div#a.x",
            Attrs::new().id("b").class("y x").attr("title", "t"),
            (),
        )
        .unwrap();
        let el = node.as_element().unwrap();
        assert_eq!(el.id.as_deref(), Some("b"));
        assert_eq!(el.classes, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(el.attrs.get("title"), Some(&AttributeValue::from("t")));
        assert_eq!(el.children.len(), 1);
        assert!(el.children[0].is_none());
    }
}
