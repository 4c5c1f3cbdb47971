//! End-to-end checks for the template binding layer:
//! - text interpolation and attribute bindings
//! - event handlers and two-way input binding
//! - branch chains mounting exactly one branch
//! - keyed list rendering with node reuse and reordering
//! - teardown through the mount scope

use std::cell::Cell;
use std::rc::Rc;

use weft::dom::{Document, Node};
use weft::reactive::{Key, Reactive, Runtime};
use weft::template::mount;
use weft::value::Value;

fn setup(entries: Vec<(&str, Value)>) -> (Runtime, Document, Node, Reactive) {
    let rt = Runtime::new();
    let doc = Document::new();
    let root = doc.create_element("div");
    let data = Reactive::new_map(&rt, entries);
    (rt, doc, root, data)
}

// =============================================================================
// Interpolation and attributes
// =============================================================================

#[test]
fn test_text_interpolation_updates() {
    let (rt, doc, root, data) = setup(vec![("name", Value::str("world"))]);
    root.append_child(&doc.create_text("Hello {{ name }}!"));
    let _scope = mount(&rt, &root, data.clone());

    assert_eq!(root.render(), "<div>Hello world!</div>");

    data.set(Key::name("name"), Value::str("templates"));
    rt.flush();
    assert_eq!(root.render(), "<div>Hello templates!</div>");
}

#[test]
fn test_attr_binding_toggles() {
    let (rt, doc, root, data) = setup(vec![
        ("cls", Value::str("warn")),
        ("disabled", Value::Bool(false)),
    ]);
    let button = doc.create_element("button");
    button.set_attr(":class", "cls");
    button.set_attr(":disabled", "disabled");
    root.append_child(&button);
    let _scope = mount(&rt, &root, data.clone());

    assert_eq!(button.attr("class").as_deref(), Some("warn"));
    assert!(button.attr("disabled").is_none());
    assert!(button.attr(":class").is_none(), "directive attrs are consumed");

    data.set(Key::name("disabled"), Value::Bool(true));
    data.set(Key::name("cls"), Value::Undefined);
    rt.flush();
    assert_eq!(button.attr("disabled").as_deref(), Some(""));
    assert!(button.attr("class").is_none());
}

// =============================================================================
// Events and v-model
// =============================================================================

#[test]
fn test_event_statement_and_cleanup() {
    let (rt, doc, root, data) = setup(vec![("n", Value::Num(0.0))]);
    let button = doc.create_element("button");
    button.set_attr("@click", "n = n + 1");
    root.append_child(&button);
    let scope = mount(&rt, &root, data.clone());

    button.dispatch("click", Value::Undefined);
    assert_eq!(data.get(&Key::name("n")).as_num(), 1.0);

    scope.cleanup();
    button.dispatch("click", Value::Undefined);
    assert_eq!(
        data.get(&Key::name("n")).as_num(),
        1.0,
        "handlers detach on cleanup"
    );
}

#[test]
fn test_event_callable_receives_payload() {
    let received = Rc::new(Cell::new(f64::NAN));
    let handler = {
        let received = received.clone();
        Value::Func(Rc::new(move |args: &[Value]| {
            if let Some(payload) = args.first() {
                received.set(payload.as_num());
            }
            Value::Undefined
        }))
    };
    let (rt, doc, root, data) = setup(vec![("pick", handler)]);
    let button = doc.create_element("button");
    button.set_attr("@select", "pick");
    root.append_child(&button);
    let _scope = mount(&rt, &root, data);

    button.dispatch("select", Value::Num(42.0));
    assert_eq!(received.get(), 42.0);
}

#[test]
fn test_v_model_round_trip() {
    let (rt, doc, root, data) = setup(vec![("draft", Value::str("a"))]);
    let input = doc.create_element("input");
    input.set_attr("v-model", "draft");
    root.append_child(&input);
    let _scope = mount(&rt, &root, data.clone());

    assert_eq!(input.attr("value").as_deref(), Some("a"));

    input.dispatch("input", Value::str("ab"));
    assert_eq!(data.get(&Key::name("draft")).display(), "ab");
    rt.flush();
    assert_eq!(input.attr("value").as_deref(), Some("ab"));

    // Writes from elsewhere flow back into the input.
    data.set(Key::name("draft"), Value::str("reset"));
    rt.flush();
    assert_eq!(input.attr("value").as_deref(), Some("reset"));
}

// =============================================================================
// Branch chains
// =============================================================================

fn branch_fixture() -> (Runtime, Node, Reactive) {
    let (rt, doc, root, data) = setup(vec![("state", Value::str("a"))]);
    let a = doc.create_element("p");
    a.set_attr("v-if", "state == 'a'");
    a.append_child(&doc.create_text("A"));
    let b = doc.create_element("p");
    b.set_attr("v-else-if", "state == 'b'");
    b.append_child(&doc.create_text("B"));
    let c = doc.create_element("p");
    c.set_attr("v-else", "");
    c.append_child(&doc.create_text("C"));
    root.append_child(&a);
    root.append_child(&b);
    root.append_child(&c);
    (rt, root, data)
}

#[test]
fn test_branch_chain_mounts_exactly_one() {
    let (rt, root, data) = branch_fixture();
    let _scope = mount(&rt, &root, data.clone());

    let rendered = root.render();
    assert!(rendered.contains("A"));
    assert!(!rendered.contains("B") && !rendered.contains("C"));

    data.set(Key::name("state"), Value::str("b"));
    rt.flush();
    let rendered = root.render();
    assert!(rendered.contains("B"));
    assert!(!rendered.contains("A") && !rendered.contains("C"));

    // No condition matches: the else branch.
    data.set(Key::name("state"), Value::str("zzz"));
    rt.flush();
    let rendered = root.render();
    assert!(rendered.contains("C"));
    assert!(!rendered.contains("A") && !rendered.contains("B"));
}

#[test]
fn test_branch_switch_cleans_up_old_scope() {
    let (rt, root, data) = branch_fixture();
    let scope = mount(&rt, &root, data.clone());
    assert_eq!(scope.child_count(), 1, "one mounted branch scope");

    data.set(Key::name("state"), Value::str("b"));
    rt.flush();
    assert_eq!(scope.child_count(), 1, "old branch scope released on switch");
}

#[test]
fn test_unchanged_branch_does_not_remount() {
    let (rt, root, data) = branch_fixture();
    let _scope = mount(&rt, &root, data.clone());

    let find_p = |root: &Node| {
        root.children()
            .into_iter()
            .find(|n| n.tag().as_deref() == Some("p"))
    };
    let before = find_p(&root).unwrap();

    // Condition re-evaluates truthy for the same branch index.
    data.set(Key::name("state"), Value::str("a")); // same value, no notify
    data.set(Key::name("other"), Value::Num(1.0));
    rt.flush();
    assert_eq!(find_p(&root).unwrap(), before);
}

// =============================================================================
// Keyed lists
// =============================================================================

fn list_items(root: &Node) -> Vec<Node> {
    let mut found = Vec::new();
    for child in root.children() {
        if child.tag().as_deref() == Some("ul") {
            for li in child.children() {
                if li.tag().as_deref() == Some("li") {
                    found.push(li);
                }
            }
        }
    }
    found
}

fn scalar_list_fixture(key: Option<&str>) -> (Runtime, Node, Reactive) {
    let (rt, doc, root, data) = setup(vec![(
        "items",
        Value::list(vec![
            Value::str("a"),
            Value::str("b"),
            Value::str("c"),
        ]),
    )]);
    let ul = doc.create_element("ul");
    let li = doc.create_element("li");
    li.set_attr("v-for", "(item, i) in items");
    if let Some(key) = key {
        li.set_attr(":key", key);
    }
    li.append_child(&doc.create_text("{{ i }}:{{ item }}"));
    ul.append_child(&li);
    root.append_child(&ul);
    (rt, root, data)
}

#[test]
fn test_list_renders_in_order() {
    let (rt, root, data) = scalar_list_fixture(Some("item"));
    let _scope = mount(&rt, &root, data);
    let texts: Vec<String> = list_items(&root).iter().map(Node::render).collect();
    assert_eq!(texts, vec!["<li>0:a</li>", "<li>1:b</li>", "<li>2:c</li>"]);
}

#[test]
fn test_keyed_reorder_reuses_nodes() {
    let (rt, root, data) = scalar_list_fixture(Some("item"));
    let _scope = mount(&rt, &root, data.clone());

    let find_by_text = |root: &Node, needle: &str| {
        list_items(root)
            .into_iter()
            .find(|li| li.render().contains(needle))
            .unwrap()
    };
    let node_a = find_by_text(&root, ":a");
    let node_c = find_by_text(&root, ":c");

    let Value::Reactive(items) = data.get(&Key::name("items")) else {
        panic!("expected the list to come back wrapped");
    };
    items.reverse();
    rt.flush();

    let texts: Vec<String> = list_items(&root).iter().map(Node::render).collect();
    assert_eq!(texts, vec!["<li>0:c</li>", "<li>1:b</li>", "<li>2:a</li>"]);
    assert_eq!(find_by_text(&root, ":a"), node_a, "nodes move, not rebuild");
    assert_eq!(find_by_text(&root, ":c"), node_c);
}

#[test]
fn test_keyless_scalar_update_in_place() {
    let (rt, root, data) = scalar_list_fixture(None);
    let _scope = mount(&rt, &root, data.clone());
    let before = list_items(&root);

    let Value::Reactive(items) = data.get(&Key::name("items")) else {
        panic!("expected the list to come back wrapped");
    };
    items.set(Key::Index(1), Value::str("B"));
    rt.flush();

    let after = list_items(&root);
    assert_eq!(after[1].render(), "<li>1:B</li>");
    assert_eq!(after[1], before[1], "positional slot updates through its ref");
}

#[test]
fn test_list_removal_destroys_subtree() {
    let (rt, root, data) = scalar_list_fixture(Some("item"));
    let scope = mount(&rt, &root, data.clone());
    assert_eq!(scope.child_count(), 3);

    let Value::Reactive(items) = data.get(&Key::name("items")) else {
        panic!("expected the list to come back wrapped");
    };
    items.splice(1, 1, vec![]);
    rt.flush();

    let texts: Vec<String> = list_items(&root).iter().map(Node::render).collect();
    assert_eq!(texts, vec!["<li>0:a</li>", "<li>1:c</li>"]);
    assert_eq!(scope.child_count(), 2, "removed item scope is released");
}

fn user_list_fixture(key: Option<&str>) -> (Runtime, Node, Reactive) {
    let (rt, doc, root, data) = setup(vec![(
        "users",
        Value::list(vec![
            Value::map(vec![("id", Value::Num(1.0)), ("name", Value::str("ada"))]),
            Value::map(vec![("id", Value::Num(2.0)), ("name", Value::str("bob"))]),
        ]),
    )]);
    let ul = doc.create_element("ul");
    let li = doc.create_element("li");
    li.set_attr("v-for", "user in users");
    if let Some(key) = key {
        li.set_attr(":key", key);
    }
    li.append_child(&doc.create_text("{{ user.name }}"));
    ul.append_child(&li);
    root.append_child(&ul);
    (rt, root, data)
}

#[test]
fn test_keyed_container_reorder_moves_nodes() {
    let (rt, root, data) = user_list_fixture(Some("user.id"));
    let _scope = mount(&rt, &root, data.clone());
    let before = list_items(&root);
    assert_eq!(before[0].render(), "<li>ada</li>");

    let Value::Reactive(users) = data.get(&Key::name("users")) else {
        panic!("expected the list to come back wrapped");
    };
    users.reverse();
    rt.flush();

    let after = list_items(&root);
    assert_eq!(after[0].render(), "<li>bob</li>");
    assert_eq!(after[1].render(), "<li>ada</li>");
    assert_eq!(after[0], before[1], "unchanged identities move, not rebuild");
    assert_eq!(after[1], before[0]);
}

#[test]
fn test_keyless_container_reorder_rebuilds() {
    let (rt, root, data) = user_list_fixture(None);
    let _scope = mount(&rt, &root, data.clone());
    let before = list_items(&root);

    let Value::Reactive(users) = data.get(&Key::name("users")) else {
        panic!("expected the list to come back wrapped");
    };
    users.reverse();
    rt.flush();

    // Positional keys: the container behind each slot changed identity,
    // so both subtrees are rebuilt.
    let after = list_items(&root);
    assert_eq!(after[0].render(), "<li>bob</li>");
    assert_eq!(after[1].render(), "<li>ada</li>");
    assert_ne!(after[0], before[1]);
    assert_ne!(after[1], before[0]);
}

#[test]
fn test_keyless_duplicate_container_items_render_per_position() {
    let user = Value::map(vec![("name", Value::str("ada"))]);
    let (rt, doc, root, data) = setup(vec![(
        "users",
        Value::list(vec![user.clone(), user]),
    )]);
    let ul = doc.create_element("ul");
    let li = doc.create_element("li");
    li.set_attr("v-for", "user in users");
    li.append_child(&doc.create_text("{{ user.name }}"));
    ul.append_child(&li);
    root.append_child(&ul);
    let _scope = mount(&rt, &root, data);

    // The same container at two positions gets one subtree per position.
    let lis = list_items(&root);
    assert_eq!(lis.len(), 2);
    assert_eq!(lis[0].render(), "<li>ada</li>");
    assert_eq!(lis[1].render(), "<li>ada</li>");
}

#[test]
fn test_container_items_track_fields_and_identity() {
    let (rt, doc, root, data) = setup(vec![(
        "users",
        Value::list(vec![
            Value::map(vec![("id", Value::Num(1.0)), ("name", Value::str("ada"))]),
            Value::map(vec![("id", Value::Num(2.0)), ("name", Value::str("bob"))]),
        ]),
    )]);
    let ul = doc.create_element("ul");
    let li = doc.create_element("li");
    li.set_attr("v-for", "user in users");
    li.set_attr(":key", "user.id");
    li.append_child(&doc.create_text("{{ user.name }}"));
    ul.append_child(&li);
    root.append_child(&ul);
    let _scope = mount(&rt, &root, data.clone());

    let before = list_items(&root);
    assert_eq!(before[0].render(), "<li>ada</li>");

    let Value::Reactive(users) = data.get(&Key::name("users")) else {
        panic!("expected the list to come back wrapped");
    };
    // Field mutation: same identity, node reused, text re-renders.
    let Value::Reactive(first) = users.get(&Key::Index(0)) else {
        panic!("expected the item to come back wrapped");
    };
    first.set(Key::name("name"), Value::str("ada lovelace"));
    rt.flush();
    let after = list_items(&root);
    assert_eq!(after[0].render(), "<li>ada lovelace</li>");
    assert_eq!(after[0], before[0]);

    // Same key, different container: the subtree is rebuilt.
    users.set(
        Key::Index(0),
        Value::map(vec![("id", Value::Num(1.0)), ("name", Value::str("eve"))]),
    );
    rt.flush();
    let rebuilt = list_items(&root);
    assert_eq!(rebuilt[0].render(), "<li>eve</li>");
    assert_ne!(rebuilt[0], before[0]);
}
