//! Fragments are transparent to reconciliation: only the flattened child list matters.

use pretty_assertions::assert_eq;
use std::{cell::RefCell, rc::Rc};
use trellis_core::{prelude::*, Mutation::*};

fn item(key: &str) -> VNode {
    h("li", Attrs::new().key(key), key).unwrap()
}

fn mounted(view: VNode) -> VirtualDom<HeadlessSurface> {
    let mut dom = VirtualDom::new(HeadlessSurface::new());
    let root = dom.surface().root();
    dom.mount(root, view).unwrap();
    dom.surface_mut().take_edits();
    dom
}

#[test]
fn nesting_does_not_replace_anything() {
    let flat = h("ul", Attrs::new(), vec![item("a"), item("b"), item("c")]).unwrap();
    let mut dom = mounted(flat);

    let nested = h(
        "ul",
        Attrs::new(),
        vec![
            item("a"),
            fragment(vec![item("b"), fragment(vec![item("c")]).unwrap()]).unwrap(),
        ],
    )
    .unwrap();
    dom.render(nested).unwrap();

    assert!(dom.surface().edits().is_empty());
}

#[test]
fn keyed_children_move_across_fragment_boundaries() {
    let mut dom = mounted(
        h(
            "ul",
            Attrs::new(),
            vec![fragment(vec![item("a"), item("b")]).unwrap(), item("c")],
        )
        .unwrap(),
    );

    let reordered = h(
        "ul",
        Attrs::new(),
        vec![item("c"), fragment(vec![item("b"), item("a")]).unwrap()],
    )
    .unwrap();
    dom.render(reordered).unwrap();

    let edits = dom.surface_mut().take_edits();
    assert!(edits.iter().all(|edit| matches!(edit, InsertBefore { .. })));
    assert_eq!(dom.surface().text_content(NodeId(1)), "cba");
}

#[test]
fn nested_lists_become_fragments() {
    let view = h(
        "p",
        Attrs::new(),
        vec![Child::from("a"), Child::from(vec!["b", "c"]), Child::from("d")],
    )
    .unwrap();

    let mut dom = mounted(view);
    assert_eq!(dom.surface().to_html(NodeId(0)), "<p>abcd</p>");

    let shorter = h(
        "p",
        Attrs::new(),
        vec![Child::from("a"), Child::from(vec!["b"]), Child::from("d")],
    )
    .unwrap();
    dom.render(shorter).unwrap();
    assert_eq!(dom.surface().to_html(NodeId(0)), "<p>abd</p>");
}

#[test]
fn a_component_returning_a_fragment_keeps_its_position() {
    let items = Rc::new(RefCell::new(vec!["b", "c"]));
    let source = items.clone();
    let list = component(
        move |_: &Cx<(), ()>| {
            let children: Vec<VNode> = source.borrow().iter().map(|s| text(*s)).collect();
            Ok(fragment(children)?)
        },
        (),
    )
    .build();
    let handle = list.redraw_handle().unwrap();

    let mut dom = VirtualDom::with_scheduler(HeadlessSurface::new(), Scheduler::immediate());
    let root = dom.surface().root();
    dom.mount(
        root,
        h("div", Attrs::new(), vec![Child::from("a"), Child::from(list), Child::from("d")]).unwrap(),
    )
    .unwrap();
    assert_eq!(dom.surface().to_html(root), "<div>abcd</div>");

    *items.borrow_mut() = vec!["c"];
    dom.redraw(&handle).unwrap();
    assert_eq!(dom.surface().to_html(root), "<div>acd</div>");

    items.borrow_mut().clear();
    dom.redraw(&handle).unwrap();
    assert_eq!(dom.surface().to_html(root), "<div>a<!---->d</div>");

    *items.borrow_mut() = vec!["b", "c"];
    dom.redraw(&handle).unwrap();
    assert_eq!(dom.surface().to_html(root), "<div>abcd</div>");
}

#[test]
fn fragments_at_the_root() {
    let mut dom = mounted(fragment(["x", "y"]).unwrap());
    assert_eq!(dom.surface().to_html(NodeId(0)), "xy");

    dom.render(fragment(["x", "y", "z"]).unwrap()).unwrap();
    assert_eq!(
        dom.surface().edits(),
        [
            CreateTextNode { text: "z".into(), id: NodeId(3) },
            InsertBefore { parent: NodeId(0), id: NodeId(3), reference: None },
        ]
    );
}
