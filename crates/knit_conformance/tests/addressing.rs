//! Reference parsing, normalization and slice arithmetic across real ports.

use knit_conformance::{array_port, at, port, siblings};
use knit_hier::{AddressError, HierError, Ref};
use knit_netlist::{Direction, Shape};

#[test]
fn slices_match_their_reparsed_form() {
    let (mut h, _top, m) = siblings(&["a"]);
    let a = m[0];
    port(&mut h, a, "x", Direction::Output, 16);
    let r = at(&h, a, "x[11:4]");

    for (hi, lo) in [(7, 0), (3, 0), (7, 4), (5, 2), (0, 0)] {
        let s = h.slice(&r, hi, lo).unwrap();
        let text = h.display_ref(&s);
        let (_, port) = text.rsplit_once('.').unwrap();
        assert_eq!(at(&h, a, port), s, "{text}");
    }
}

#[test]
fn slices_compose_relative_offsets() {
    let (mut h, _top, m) = siblings(&["a"]);
    let a = m[0];
    port(&mut h, a, "x", Direction::Output, 16);
    let r = at(&h, a, "x[11:4]");
    let inner = h.slice(&r, 5, 2).unwrap();
    assert_eq!(inner, at(&h, a, "x[9:6]"));
    assert_eq!(h.slice(&inner, 1, 1).unwrap(), at(&h, a, "x[7]"));
    assert_eq!(h.bit(&inner, 1).unwrap(), at(&h, a, "x[7:7]"));
}

#[test]
fn full_width_slices_collapse() {
    let (mut h, _top, m) = siblings(&["a"]);
    let a = m[0];
    port(&mut h, a, "x", Direction::Output, 8);
    array_port(&mut h, a, "arr", Direction::Output, &[4, 3], 8);

    let whole = at(&h, a, "x");
    assert_eq!(at(&h, a, "x[7:0]"), whole);
    assert_eq!(h.slice(&whole, 7, 0).unwrap(), whole);
    assert_eq!(h.display_ref(&at(&h, a, "x[7:0]")), "top.a.x");

    assert_eq!(at(&h, a, "arr[2][2:0]"), at(&h, a, "arr[2]"));
    assert_eq!(at(&h, a, "arr[2][1][7:0]"), at(&h, a, "arr[2][1]"));
    assert_eq!(at(&h, a, "arr[3:0]"), at(&h, a, "arr"));
    assert_eq!(h.display_ref(&at(&h, a, "arr[1][0][7:0]")), "top.a.arr[1][0]");
}

#[test]
fn widths_resolve_indices_before_slices() {
    let (mut h, _top, m) = siblings(&["a"]);
    let a = m[0];
    array_port(&mut h, a, "arr", Direction::Output, &[4, 3], 8);

    assert_eq!(h.width(&at(&h, a, "arr")).unwrap(), 96);
    assert_eq!(h.width(&at(&h, a, "arr[2]")).unwrap(), 24);
    assert_eq!(h.width(&at(&h, a, "arr[2][1]")).unwrap(), 8);
    assert_eq!(h.width(&at(&h, a, "arr[2][1][6:4]")).unwrap(), 3);
    assert_eq!(h.shape_of(&at(&h, a, "arr[2]")).unwrap(), Shape::array(vec![3], 8));
    assert_eq!(h.shape_of(&at(&h, a, "arr[1:0]")).unwrap(), Shape::array(vec![2, 3], 8));
}

#[test]
fn replicas_take_the_selected_shape() {
    let (mut h, _top, m) = siblings(&["a", "b"]);
    let (a, b) = (m[0], m[1]);
    array_port(&mut h, a, "arr", Direction::Output, &[5, 3], 4);

    let r = at(&h, a, "arr[2]");
    let copy: Ref = h.replicate_to(&r, b, Direction::Input).unwrap().into();
    assert_eq!(h.shape_of(&copy).unwrap(), Shape::array(vec![3], 4));
    assert_eq!(h.display_ref(&copy), "top.b.arr");

    let bit: Ref = h
        .replicate_to(&at(&h, a, "arr[4][1][2]"), b, Direction::Input)
        .unwrap()
        .into();
    assert_eq!(h.width(&bit).unwrap(), 1);
    assert_eq!(h.display_ref(&bit), "top.b.arr_1");
}

#[test]
fn grammar_errors() {
    let (mut h, _top, m) = siblings(&["a"]);
    let a = m[0];
    array_port(&mut h, a, "arr", Direction::Output, &[4], 8);

    let err = |text: &str| h.port_ref(a, text).unwrap_err();
    assert!(matches!(
        err("arr[1:0][2:0]"),
        HierError::Address(AddressError::MultipleRanges { .. })
    ));
    assert!(matches!(
        err("arr[1:0][2]"),
        HierError::Address(AddressError::SliceBeforeIndex { .. })
    ));
    assert!(matches!(err("arr[0:1]"), HierError::Address(_)));
    assert!(matches!(err("arr[9]"), HierError::Address(_)));
    assert!(matches!(err("arr[x]"), HierError::Address(_)));
    assert!(matches!(err("nope"), HierError::UnknownPort { .. }));
}
