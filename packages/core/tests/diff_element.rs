use pretty_assertions::assert_eq;
use std::{cell::Cell, rc::Rc};
use trellis_core::{prelude::*, AttributeValue, Mutation::*};

fn mounted(view: VNode) -> VirtualDom<HeadlessSurface> {
    let mut dom = VirtualDom::new(HeadlessSurface::new());
    let root = dom.surface().root();
    dom.mount(root, view).unwrap();
    dom.surface_mut().take_edits();
    dom
}

#[test]
fn text_diff() {
    let mut dom = mounted(h("p", Attrs::new(), "a").unwrap());

    dom.render(h("p", Attrs::new(), "b").unwrap()).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [SetText { text: "b".into(), id: NodeId(2) }]
    );
}

#[test]
fn element_swap() {
    let mut dom = mounted(h("div", Attrs::new(), ()).unwrap());

    dom.render(h("span", Attrs::new(), ()).unwrap()).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            CreateElement { tag: "span".into(), id: NodeId(2) },
            ReplaceWith { old: NodeId(1), new: NodeId(2) },
        ]
    );
    assert_eq!(dom.surface().to_html(NodeId(0)), "<span></span>");
}

#[test]
fn attribute_diff() {
    let mut dom = mounted(
        h(
            "div",
            Attrs::new().attr("title", "a").attr("hidden", true),
            (),
        )
        .unwrap(),
    );

    dom.render(
        h(
            "div",
            Attrs::new().attr("title", "b").attr("data-x", 1i64),
            (),
        )
        .unwrap(),
    )
    .unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            SetAttribute { name: "data-x".into(), value: AttributeValue::Int(1), id: NodeId(1) },
            RemoveAttribute { name: "hidden".into(), id: NodeId(1) },
            SetAttribute { name: "title".into(), value: AttributeValue::Text("b".into()), id: NodeId(1) },
        ]
    );
}

#[test]
fn id_and_class_diff() {
    let mut dom = mounted(h("div#a.x.y", Attrs::new(), ()).unwrap());

    // same class set in another order is not a change
    dom.render(h("div#b.y.x", Attrs::new(), ()).unwrap()).unwrap();
    assert_eq!(
        dom.surface_mut().take_edits(),
        [SetAttribute { name: "id".into(), value: AttributeValue::Text("b".into()), id: NodeId(1) }]
    );

    dom.render(h("div", Attrs::new(), ()).unwrap()).unwrap();
    assert_eq!(
        dom.surface_mut().take_edits(),
        [
            RemoveAttribute { name: "id".into(), id: NodeId(1) },
            RemoveAttribute { name: "class".into(), id: NodeId(1) },
        ]
    );
}

#[test]
fn identical_views_produce_no_edits() {
    let view = || {
        h(
            "section.card",
            Attrs::new().attr("role", "note"),
            vec![h("h1", Attrs::new(), "title").unwrap(), text("body")],
        )
        .unwrap()
    };
    let mut dom = mounted(view());

    dom.render(view()).unwrap();
    dom.render(view()).unwrap();

    assert!(dom.surface().edits().is_empty());
}

#[test]
fn listeners_are_added_and_removed() {
    let mut dom = mounted(h("button", Attrs::new(), "go").unwrap());

    dom.render(h("button", Attrs::new().on("click", |_| {}), "go").unwrap())
        .unwrap();
    assert_eq!(
        dom.surface_mut().take_edits(),
        [NewEventListener { name: "click".into(), id: NodeId(1) }]
    );
    assert!(dom.surface().has_listener(NodeId(1), "click"));

    dom.render(h("button", Attrs::new(), "go").unwrap()).unwrap();
    assert_eq!(
        dom.surface_mut().take_edits(),
        [RemoveEventListener { name: "click".into(), id: NodeId(1) }]
    );
    assert!(!dom.dispatch_event(NodeId(1), &Event::new("click")).unwrap());
}

#[test]
fn swapping_a_handler_does_not_touch_the_surface() {
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));

    let button = |count: Rc<Cell<i32>>| {
        h(
            "button",
            Attrs::new().on("click", move |_| count.set(count.get() + 1)),
            "go",
        )
        .unwrap()
    };

    let mut dom = mounted(button(first.clone()));
    dom.render(button(second.clone())).unwrap();
    assert!(dom.surface().edits().is_empty());

    assert!(dom.dispatch_event(NodeId(1), &Event::new("click")).unwrap());
    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
}

#[test]
fn event_data_reaches_the_handler() {
    let seen = Rc::new(Cell::new(0));
    let seen2 = seen.clone();
    let mut dom = mounted(
        h(
            "input",
            Attrs::new().on("input", move |event| {
                if let Some(value) = event.data::<i32>() {
                    seen2.set(*value);
                }
            }),
            (),
        )
        .unwrap(),
    );

    let handled = dom
        .dispatch_event(NodeId(1), &Event::new("input").with_data(42))
        .unwrap();
    assert!(handled);
    assert_eq!(seen.get(), 42);

    // nothing listens for this one
    assert!(!dom.dispatch_event(NodeId(1), &Event::new("blur")).unwrap());
}

#[test]
fn nested_children_reconcile_in_place() {
    let view = |label: &str| {
        h(
            "div",
            Attrs::new(),
            h("span", Attrs::new(), vec![text("hello "), text(label)]).unwrap(),
        )
        .unwrap()
    };
    let mut dom = mounted(view("world"));

    dom.render(view("there")).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [SetText { text: "there".into(), id: NodeId(4) }]
    );
    assert_eq!(
        dom.surface().to_html(NodeId(0)),
        "<div><span>hello there</span></div>"
    );
}

#[test]
fn reconcile_works_without_a_root() {
    let mut dom = VirtualDom::new(HeadlessSurface::new());
    let root = dom.surface().root();

    let first = h("p", Attrs::new().attr("title", "a"), "x").unwrap();
    assert_eq!(dom.reconcile(None, Some(&first), root).unwrap(), Some(NodeId(1)));

    let second = h("p", Attrs::new().attr("title", "b"), "x").unwrap();
    assert_eq!(
        dom.reconcile(Some(&first), Some(&second), root).unwrap(),
        Some(NodeId(1))
    );
    assert_eq!(
        dom.surface().attribute(NodeId(1), "title"),
        Some(&AttributeValue::Text("b".into()))
    );

    assert_eq!(dom.reconcile(Some(&second), None, root).unwrap(), None);
    assert!(dom.surface().children(root).is_empty());
    assert!(dom.root_view().is_none());
}
