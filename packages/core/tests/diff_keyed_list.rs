//! Diffing tests for child lists.
//!
//! These only check the surface edits for lists inside one element. Component lifecycles are covered in
//! `lifecycle.rs`.

use pretty_assertions::assert_eq;
use trellis_core::{prelude::*, Mutation::*};

fn list(keys: &[i32]) -> VNode {
    let items: Vec<VNode> = keys
        .iter()
        .map(|k| h("li", Attrs::new().key(*k), k.to_string()).unwrap())
        .collect();
    h("ul", Attrs::new(), items).unwrap()
}

fn mounted(view: VNode) -> VirtualDom<HeadlessSurface> {
    let mut dom = VirtualDom::new(HeadlessSurface::new());
    let root = dom.surface().root();
    dom.mount(root, view).unwrap();
    dom.surface_mut().take_edits();
    dom
}

/// `li` for key `k` is NodeId(2k), its text NodeId(2k + 1), the `ul` NodeId(1)
fn li(key: usize) -> NodeId {
    NodeId(key * 2)
}

/// Should result in moves, but not removals or additions
#[test]
fn keyed_diffing_out_of_order() {
    let mut dom = mounted(list(&[1, 2, 3, 4, 5, 6]));

    dom.render(list(&[2, 4, 1, 5, 3, 6])).unwrap();

    // 2, 4, 5, 6 form the longest run already in order, so only 1 and 3 travel
    assert_eq!(
        dom.surface().edits(),
        [
            InsertBefore { parent: NodeId(1), id: li(3), reference: Some(li(6)) },
            InsertBefore { parent: NodeId(1), id: li(1), reference: Some(li(5)) },
        ]
    );
    assert_eq!(dom.surface().text_content(NodeId(1)), "241536");
}

#[test]
fn keyed_diffing_reversal_keeps_one_in_place() {
    let mut dom = mounted(list(&[1, 2, 3, 4]));

    dom.render(list(&[4, 3, 2, 1])).unwrap();

    let edits = dom.surface_mut().take_edits();
    assert_eq!(edits.len(), 3);
    assert!(edits.iter().all(|edit| matches!(edit, InsertBefore { .. })));
    assert_eq!(dom.surface().text_content(NodeId(1)), "4321");
}

#[test]
fn keyed_diffing_additions() {
    let mut dom = mounted(list(&[1, 2]));

    dom.render(list(&[1, 2, 3])).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            CreateElement { tag: "li".into(), id: NodeId(6) },
            CreateTextNode { text: "3".into(), id: NodeId(7) },
            InsertBefore { parent: NodeId(6), id: NodeId(7), reference: None },
            InsertBefore { parent: NodeId(1), id: NodeId(6), reference: None },
        ]
    );
}

#[test]
fn keyed_diffing_additions_at_the_front() {
    let mut dom = mounted(list(&[2]));

    dom.render(list(&[1, 2])).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            CreateElement { tag: "li".into(), id: NodeId(4) },
            CreateTextNode { text: "1".into(), id: NodeId(5) },
            InsertBefore { parent: NodeId(4), id: NodeId(5), reference: None },
            InsertBefore { parent: NodeId(1), id: NodeId(4), reference: Some(NodeId(2)) },
        ]
    );
    assert_eq!(dom.surface().text_content(NodeId(1)), "12");
}

#[test]
fn keyed_diffing_removals() {
    let mut dom = mounted(list(&[1, 2, 3]));

    dom.render(list(&[1, 3])).unwrap();

    assert_eq!(dom.surface().edits(), [Remove { id: li(2) }]);
    assert_eq!(dom.surface().text_content(NodeId(1)), "13");
}

#[test]
fn keyed_diffing_mixed_changes() {
    let mut dom = mounted(list(&[1, 2, 3, 4, 5]));

    dom.render(list(&[5, 9, 1, 3, 7])).unwrap();

    let edits = dom.surface_mut().take_edits();
    let created = edits
        .iter()
        .filter(|edit| matches!(edit, CreateElement { .. }))
        .count();
    let removed = edits
        .iter()
        .filter(|edit| matches!(edit, Remove { .. }))
        .count();
    assert_eq!(created, 2);
    assert_eq!(removed, 2);
    assert_eq!(dom.surface().text_content(NodeId(1)), "59137");
}

#[test]
fn keyed_siblings_keep_their_host_nodes() {
    let mut dom = mounted(list(&[1, 2, 3]));

    dom.render(list(&[3, 1, 2])).unwrap();

    assert_eq!(dom.surface().children(NodeId(1)), [li(3), li(1), li(2)]);
}

#[test]
fn unkeyed_lists_patch_in_order() {
    let mut dom = mounted(h("ul", Attrs::new(), ["a", "b", "c"]).unwrap());

    dom.render(h("ul", Attrs::new(), ["a", "x"]).unwrap())
        .unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            SetText { text: "x".into(), id: NodeId(3) },
            Remove { id: NodeId(4) },
        ]
    );
}

#[test]
fn absent_slots_fill_in_place() {
    let with_gap = vec![Child::from("a"), Child::from(false), Child::from("c")];
    let mut dom = mounted(h("ul", Attrs::new(), with_gap).unwrap());

    let filled = vec![Child::from("a"), Child::from("b"), Child::from("c")];
    dom.render(h("ul", Attrs::new(), filled).unwrap()).unwrap();

    assert_eq!(
        dom.surface().edits(),
        [
            CreateTextNode { text: "b".into(), id: NodeId(4) },
            InsertBefore { parent: NodeId(1), id: NodeId(4), reference: Some(NodeId(3)) },
        ]
    );
    assert_eq!(dom.surface().text_content(NodeId(1)), "abc");
}

#[test]
fn changed_shape_under_the_same_key_is_recreated() {
    let mut dom = mounted(list(&[1, 2]));

    let swapped = h(
        "ul",
        Attrs::new(),
        vec![
            h("li", Attrs::new().key(1), "1").unwrap(),
            h("p", Attrs::new().key(2), "2").unwrap(),
        ],
    )
    .unwrap();
    dom.render(swapped).unwrap();

    let edits = dom.surface_mut().take_edits();
    assert!(edits.contains(&CreateElement { tag: "p".into(), id: NodeId(6) }));
    assert_eq!(dom.surface().to_html(NodeId(0)), "<ul><li>1</li><p>2</p></ul>");
}
