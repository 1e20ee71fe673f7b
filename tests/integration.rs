//! Integration tests for dtw.
//!
//! These tests exercise the public API from outside the crate, verifying that
//! records, collections, transformers, widgets, and the reference element
//! tree work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dtw::data::{callback, Event, KeyedCollection, NodeCallback, OrderedCollection, Patch, Record, Snapshot};
use dtw::dom::{Dom, ElementData, ElementId, TEMPLATE_ATTRIBUTE};
use dtw::testing::{render_children, render_pretty, render_to_string};
use dtw::widget::{by_number, Blueprint, GroupConfig, Renderable, Widget, WidgetGroup};
use dtw::{Error, Node, Observable, Transformer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn record(value: Value) -> Record {
    Record::from_json(value).unwrap()
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[test]
fn test_set_merges_into_snapshot() {
    let r = record(json!({"title": "A", "amount": 2}));
    r.set(Patch::new().set("amount", 3)).unwrap();
    assert_eq!(Value::Object((*r.data()).clone()), json!({"title": "A", "amount": 3}));
}

#[test]
fn test_delete_marker_removes_key() {
    let r = record(json!({"title": "A", "remark": "x"}));
    r.set(Patch::new().delete("remark")).unwrap();
    assert_eq!(Value::Object((*r.data()).clone()), json!({"title": "A"}));
}

#[test]
fn test_previous_snapshot_survives_set() {
    let r = record(json!({"n": 1}));
    let before = r.data();
    r.set(Patch::new().set("n", 2)).unwrap();
    assert_eq!(before.get("n"), Some(&json!(1)));
    assert_eq!(r.get("n"), Some(json!(2)));
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[test]
fn test_membership_errors() {
    let list = OrderedCollection::new();
    let stranger = record(json!({}));
    assert_eq!(list.remove(&stranger.clone().into()), Err(Error::NotAMember));

    let map = KeyedCollection::new();
    let x = record(json!({"v": 1}));
    map.add("k", x.clone()).unwrap();
    map.add("k", x.clone()).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(
        map.add("k", record(json!({"v": 2}))),
        Err(Error::DuplicateKey { key: "k".into() })
    );
    assert_eq!(map.remove_key("nope"), Err(Error::MissingKey("nope".into())));
}

#[test]
fn test_deep_change_bubbles_with_leaf_as_child() {
    let outer = OrderedCollection::new();
    let inner = KeyedCollection::new();
    let leaf = record(json!({"v": 1}));
    inner.add("leaf", leaf.clone()).unwrap();
    outer.add(inner.clone()).unwrap();

    let seen = Rc::new(Cell::new(0));
    let leaf_node: Node = leaf.clone().into();
    let on_change: NodeCallback = {
        let seen = Rc::clone(&seen);
        callback(move |_: &Node, event: &Event| {
            assert!(event.child().is_some_and(|child| child.ptr_eq(&leaf_node)));
            seen.set(seen.get() + 1);
            Ok(())
        })
    };
    outer.subscribe("change.data", &on_change);

    leaf.set(Patch::new().set("v", 2)).unwrap();
    assert_eq!(seen.get(), 1);

    outer.remove(&inner.clone().into()).unwrap();
    leaf.set(Patch::new().set("v", 3)).unwrap();
    assert_eq!(seen.get(), 1);
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

fn number(data: &Snapshot, field: &str) -> dtw::Result<f64> {
    data.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::transform(format_args!("`{field}` is not a number")))
}

fn thermometer(base: Record) -> Transformer {
    Transformer::derive(
        base,
        |data: &Snapshot| Ok(Patch::new().set("fahrenheit", number(data, "celsius")? * 9.0 / 5.0 + 32.0)),
        |data: &Snapshot| {
            let f = number(data, "fahrenheit")?;
            if f < -459.67 {
                return Err(Error::transform("below absolute zero"));
            }
            Ok(Patch::new().set("celsius", (f - 32.0) * 5.0 / 9.0))
        },
    )
    .unwrap()
}

#[test]
fn test_celsius_fahrenheit_round_trip() {
    let base = record(json!({"celsius": 0}));
    let t = thermometer(base.clone());
    assert_eq!(t.derived().get("fahrenheit").and_then(|v| v.as_f64()), Some(32.0));

    base.set(Patch::new().set("celsius", 100)).unwrap();
    assert_eq!(t.derived().get("fahrenheit").and_then(|v| v.as_f64()), Some(212.0));

    t.derived().set(Patch::new().set("fahrenheit", 32)).unwrap();
    assert_eq!(base.get("celsius").and_then(|v| v.as_f64()), Some(0.0));
}

#[test]
fn test_failed_unmorph_leaves_base_untouched() {
    let base = record(json!({"celsius": 10}));
    let t = thermometer(base.clone());
    let err = t.derived().set(Patch::new().set("fahrenheit", -500)).unwrap_err();
    assert_eq!(err, Error::Transform("below absolute zero".into()));
    assert_eq!(base.get("celsius"), Some(json!(10)));
}

// ---------------------------------------------------------------------------
// Widgets over the reference tree
// ---------------------------------------------------------------------------

fn cart() -> (Rc<RefCell<Dom>>, ElementId) {
    let mut dom = Dom::new();
    let list = dom.insert(ElementData::new("ul").with_id("cart"));
    let template = dom.insert_child(
        list,
        ElementData::new("li")
            .with_attr(TEMPLATE_ATTRIBUTE, "item")
            .with_bind("class:kind; .name // name; .qty // qty"),
    );
    dom.insert_child(template, ElementData::new("span").with_class("name"));
    dom.insert_child(template, ElementData::new("span").with_class("qty"));
    dom.harvest_templates(list).unwrap();
    (Rc::new(RefCell::new(dom)), list)
}

#[test]
fn test_group_renders_sorted_markup() {
    let (dom, list) = cart();
    let items = OrderedCollection::new();
    let group = WidgetGroup::new(Rc::clone(&dom), list, items.clone(), GroupConfig::new()).unwrap();

    let milk = record(json!({"id": "milk", "name": "Milk", "qty": 2, "kind": "dairy"}));
    items.add(milk.clone()).unwrap();
    items.add(record(json!({"id": "apple", "name": "Apple", "qty": 6, "kind": "fruit"})))
        .unwrap();

    insta::assert_snapshot!(render_pretty(&dom.borrow(), list), @r###"
    <ul id="cart">
      <li class="fruit">
        <span class="name">Apple</span>
        <span class="qty">6</span>
      </li>
      <li class="dairy">
        <span class="name">Milk</span>
        <span class="qty">2</span>
      </li>
    </ul>
    "###);

    milk.set(Patch::new().set("qty", 3)).unwrap();
    assert!(render_children(&dom.borrow(), list).ends_with(r#"<span class="qty">3</span></li>"#));
    assert_eq!(group.len(), 2);
}

#[test]
fn test_numeric_ids_render_ascending() {
    let (dom, list) = cart();
    let items = OrderedCollection::new();
    let _group = WidgetGroup::new(
        Rc::clone(&dom),
        list,
        items.clone(),
        GroupConfig::new().with_comparator(by_number("id")),
    )
    .unwrap();
    for id in [3, 1, 2] {
        items.add(record(json!({"id": id, "name": format!("#{id}")}))).unwrap();
    }
    let names: Vec<String> = {
        let dom = dom.borrow();
        dom.children(list)
            .iter()
            .map(|&li| render_to_string(&dom, dom.children(li)[0]))
            .collect()
    };
    assert_eq!(
        names,
        vec![
            r#"<span class="name">#1</span>"#,
            r#"<span class="name">#2</span>"#,
            r#"<span class="name">#3</span>"#,
        ]
    );
}

#[test]
fn test_widget_tracks_derived_record() {
    let mut dom = Dom::new();
    let panel = dom.insert(ElementData::new("div"));
    dom.insert_child(
        panel,
        ElementData::new("output")
            .with_attr(TEMPLATE_ATTRIBUTE, "reading")
            .with_bind("fahrenheit"),
    );
    dom.harvest_templates(panel).unwrap();
    let dom = Rc::new(RefCell::new(dom));

    let base = record(json!({"celsius": 20}));
    let t = thermometer(base.clone());
    let blueprint = Blueprint::new("reading").with_formatter("fahrenheit", |v: Option<&Value>| {
        Renderable::Scalar(format!("{:.0}°F", v.and_then(Value::as_f64).unwrap_or_default()))
    });
    let w = Widget::build(&dom, t.derived().clone(), panel, blueprint).unwrap();
    assert_eq!(render_to_string(&dom.borrow(), w.element()), "<output>68°F</output>");

    base.set(Patch::new().set("celsius", 100)).unwrap();
    assert_eq!(render_to_string(&dom.borrow(), w.element()), "<output>212°F</output>");
}

#[test]
fn test_widget_mounts_another_widget() {
    let mut dom = Dom::new();
    let app = dom.insert(ElementData::new("main"));
    let card = dom.insert_child(
        app,
        ElementData::new("article")
            .with_attr(TEMPLATE_ATTRIBUTE, "card")
            .with_bind("h1 // title; .slot // badge"),
    );
    dom.insert_child(card, ElementData::new("h1"));
    dom.insert_child(card, ElementData::new("div").with_class("slot"));
    dom.insert_child(
        app,
        ElementData::new("span")
            .with_attr(TEMPLATE_ATTRIBUTE, "badge")
            .with_bind("label"),
    );
    assert_eq!(dom.harvest_templates(app).unwrap(), 2);
    let dom = Rc::new(RefCell::new(dom));

    let badge_data = record(json!({"label": "new"}));
    let badge = Widget::build(&dom, badge_data.clone(), app, Blueprint::new("badge")).unwrap();
    let badge_el = badge.element();
    let card = Widget::build(
        &dom,
        record(json!({"title": "Hello"})),
        app,
        Blueprint::new("card").with_formatter("badge", move |_: Option<&Value>| Renderable::Element(badge_el)),
    )
    .unwrap();
    assert_eq!(
        render_to_string(&dom.borrow(), card.element()),
        r#"<article><h1>Hello</h1><div class="slot"><span>new</span></div></article>"#
    );

    badge_data.set(Patch::new().set("label", "hot")).unwrap();
    assert!(render_to_string(&dom.borrow(), card.element()).contains("<span>hot</span>"));
}

#[test]
fn test_group_teardown_and_consistency_errors() {
    let (dom, list) = cart();
    let items = KeyedCollection::new();
    let group = WidgetGroup::new(Rc::clone(&dom), list, items.clone(), GroupConfig::new()).unwrap();
    items.add("a", record(json!({"id": "a", "name": "A"}))).unwrap();

    let ghost = record(json!({"id": "ghost"}));
    let err = items
        .emit(&Event::Remove {
            child: ghost.into(),
            key: Some("ghost".into()),
        })
        .unwrap_err();
    assert_eq!(err, Error::Desync { id: Some("ghost".into()) });

    group.remove().unwrap();
    assert_eq!(render_children(&dom.borrow(), list), "");
    assert_eq!(group.remove(), Err(Error::DoubleRemove));
}

#[test]
fn test_group_requires_template() {
    let dom = Rc::new(RefCell::new(Dom::new()));
    let bare = dom.borrow_mut().insert(ElementData::new("ul"));
    let err = WidgetGroup::new(dom, bare, OrderedCollection::new(), GroupConfig::new()).unwrap_err();
    assert_eq!(err, Error::MissingTemplate { template: "item".into() });
}
