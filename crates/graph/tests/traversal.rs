use std::sync::{Arc, LazyLock, Mutex};

use pathbind_core::{Bind, BindingError, Nested, Session, Source, TableBuilder, Visitor};
use pathbind_graph::{Bean, Graph, GraphSource, Schema, Value};
use rstest::{fixture, rstest};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.lock().expect("log lock").push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

#[fixture]
fn session() -> Arc<Session> {
    Arc::new(Session::new())
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<String>,
    children: Vec<Arc<Node>>,
}

impl Node {
    fn new(name: &str, children: Vec<Arc<Node>>) -> Arc<Self> {
        Arc::new(Self { name: name.to_owned(), parent: None, children })
    }
}

static NODE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder::<Node>("Node")
        .field("name", |node| node.name.as_str().into())
        .field("parent", |node| node.parent.clone().into())
        .field("children", |node| node.children.clone().into())
        .accessor("getSize", |node| node.children.len().into())
        .build()
});

impl Bean for Node {
    fn schema(&self) -> &'static Schema {
        &NODE
    }
}

struct Tree {
    log: Log,
}

impl Visitor for Tree {
    fn visit_end(&mut self) {
        record(&self.log, "end tree");
    }
}

impl Bind<Graph> for Tree {
    fn bind(bindings: &mut TableBuilder<Graph, Self>) {
        bindings.bind("this", ["name", "getSize()"], |tree: &mut Tree, name: String, size: i32| {
            record(&tree.log, format!("node {name} {size}"));
        });
        bindings.bind("this.children[]", ["this"], |tree: &mut Tree, child: Arc<Node>| {
            record(&tree.log, format!("child {}", child.name));
            Nested::<Graph>::new(Child { log: Arc::clone(&tree.log), name: child.name.clone() })
        });
    }
}

struct Child {
    log: Log,
    name: String,
}

impl Visitor for Child {
    fn visit_end(&mut self) {
        record(&self.log, format!("end child {}", self.name));
    }
}

impl Bind<Graph> for Child {
    fn bind(bindings: &mut TableBuilder<Graph, Self>) {
        bindings.bind("this", ["this.name"], |child: &mut Child, name: String| {
            record(&child.log, format!("inside {name}"));
        });
    }
}

#[rstest]
fn children_are_visited_once_each(session: Arc<Session>) {
    let root = Node::new("root", vec![Node::new("c0", Vec::new()), Node::new("c1", Vec::new())]);
    let log = Log::default();
    GraphSource::new(Arc::clone(&session), root)
        .accept(&mut Tree { log: Arc::clone(&log) })
        .expect("traversal succeeds");

    assert_eq!(
        entries(&log),
        [
            "node root 2",
            "child c0",
            "inside c0",
            "end child c0",
            "child c1",
            "inside c1",
            "end child c1",
            "end tree",
        ]
    );
    assert!(session.contains::<Graph, Child>());
}

#[rstest]
fn empty_collections_invoke_nothing(session: Arc<Session>) {
    let log = Log::default();
    GraphSource::new(session, Node::new("leaf", Vec::new()))
        .accept(&mut Tree { log: Arc::clone(&log) })
        .expect("traversal succeeds");
    assert_eq!(entries(&log), ["node leaf 0", "end tree"]);
}

struct Siblings {
    log: Log,
}

impl Visitor for Siblings {
    fn visit_end(&mut self) {
        record(&self.log, "end siblings");
    }
}

impl Bind<Graph> for Siblings {
    fn bind(bindings: &mut TableBuilder<Graph, Self>) {
        bindings
            .bind("children", [], |siblings: &mut Siblings| {
                Nested::<Graph>::new(Siblings { log: Arc::clone(&siblings.log) })
            })
            .yields::<Siblings>();
        bindings.bind("name", ["this"], |siblings: &mut Siblings, name: String| {
            record(&siblings.log, name);
        });
    }
}

#[rstest]
fn collection_visitor_ends_once_after_all_elements(session: Arc<Session>) {
    let root = Node::new("root", vec![Node::new("a", Vec::new()), Node::new("b", Vec::new())]);
    let log = Log::default();
    GraphSource::new(session, root).accept(&mut Siblings { log: Arc::clone(&log) }).expect("traversal succeeds");
    // Leaf nodes yield empty collections, whose visitors never end.
    assert_eq!(entries(&log), ["a", "b", "end siblings", "root", "end siblings"]);
}

struct ByParent {
    log: Log,
}

impl Visitor for ByParent {
    fn visit_end(&mut self) {
        record(&self.log, "end");
    }
}

impl Bind<Graph> for ByParent {
    fn bind(bindings: &mut TableBuilder<Graph, Self>) {
        bindings.bind("parent", [], |by_parent: &mut ByParent| {
            Nested::<Graph>::new(ByParent { log: Arc::clone(&by_parent.log) })
        });
        bindings.bind("this", ["parent"], |by_parent: &mut ByParent, parent: Option<String>| {
            record(&by_parent.log, format!("parent {parent:?}"));
        });
    }
}

#[rstest]
fn null_targets_only_end_the_nested_visitor(session: Arc<Session>) {
    let log = Log::default();
    GraphSource::new(session, Node::new("orphan", Vec::new()))
        .accept(&mut ByParent { log: Arc::clone(&log) })
        .expect("traversal succeeds");
    assert_eq!(entries(&log), ["end", "parent None", "end"]);
}

macro_rules! visitor_binding {
    ($name:ident, $key:literal, [$($param:literal),*], ($($arg:ident: $ty:ty),*)) => {
        struct $name;

        impl Visitor for $name {
            fn visit_end(&mut self) {}
        }

        impl Bind<Graph> for $name {
            fn bind(bindings: &mut TableBuilder<Graph, Self>) {
                bindings.bind($key, [$($param),*], |_: &mut $name $(, $arg: $ty)*| {
                    $(let _ = $arg;)*
                });
            }
        }
    };
}

visitor_binding!(Unknown, "this.missing", [], ());
visitor_binding!(IteratesName, "name[]", [], ());
visitor_binding!(RequiredParent, "this", ["parent"], (parent: String));
visitor_binding!(Mistyped, "this", ["name"], (name: i32));
visitor_binding!(DeepPath, "name.length", [], ());

#[rstest]
fn unknown_property_is_unresolved(session: Arc<Session>) {
    let err = GraphSource::new(session, Node::new("n", Vec::new())).accept(&mut Unknown).expect_err("must fail");
    assert_eq!(err.path(), Some("missing"));
    assert!(matches!(
        err.kind(),
        BindingError::UnresolvedPath { segment, type_name } if segment == "missing" && type_name == "Node"
    ));
}

#[rstest]
fn iterating_a_scalar_is_not_iterable(session: Arc<Session>) {
    let err = GraphSource::new(session, Node::new("n", Vec::new())).accept(&mut IteratesName).expect_err("must fail");
    assert!(matches!(err.kind(), BindingError::NotIterable { type_name } if type_name == "string"));
}

#[rstest]
fn descending_into_a_string_is_unresolved(session: Arc<Session>) {
    let err = GraphSource::new(session, Node::new("n", Vec::new())).accept(&mut DeepPath).expect_err("must fail");
    assert!(matches!(err.kind(), BindingError::UnresolvedPath { type_name, .. } if type_name == "string"));
}

#[rstest]
fn null_for_required_parameter_fails(session: Arc<Session>) {
    let err =
        GraphSource::new(session, Node::new("n", Vec::new())).accept(&mut RequiredParent).expect_err("must fail");
    assert!(matches!(err.kind(), BindingError::ParameterConversion { text: None, .. }));
}

#[rstest]
fn mistyped_parameter_is_an_invocation_error(session: Arc<Session>) {
    let err = GraphSource::new(session, Node::new("n", Vec::new())).accept(&mut Mistyped).expect_err("must fail");
    assert!(matches!(err.kind(), BindingError::Invocation(_)));
    assert!(err.to_string().contains("expected integer, found string"), "{err}");
}

#[derive(Debug)]
struct Person {
    id: i64,
    name: String,
}

#[derive(Debug)]
struct Employee {
    person: Person,
    id: i64,
    title: String,
}

static PERSON: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder::<Person>("Person")
        .field("id", |person| person.id.into())
        .field("name", |person| person.name.as_str().into())
        .accessor("display", |person| format!("{} ({})", person.name, person.id).into())
        .build()
});

static EMPLOYEE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder::<Employee>("Employee")
        .field("id", |employee| employee.id.into())
        .field("title", |employee| employee.title.as_str().into())
        .extends(&PERSON, |employee| &employee.person)
        .build()
});

impl Bean for Employee {
    fn schema(&self) -> &'static Schema {
        &EMPLOYEE
    }
}

#[derive(Default)]
struct Badge {
    lines: Vec<String>,
}

impl Visitor for Badge {
    fn visit_end(&mut self) {}
}

impl Bind<Graph> for Badge {
    fn bind(bindings: &mut TableBuilder<Graph, Self>) {
        bindings.bind(
            "this",
            ["id", "name", "title", "display()"],
            |badge: &mut Badge, id: i64, name: String, title: String, display: String| {
                badge.lines.push(format!("{id} {name} {title} {display}"));
            },
        );
    }
}

#[rstest]
fn properties_resolve_through_the_hierarchy(session: Arc<Session>) {
    let employee = Value::object(Employee {
        person: Person { id: 7, name: "Ada".into() },
        id: 1001,
        title: "Engineer".into(),
    });
    let mut badge = Badge::default();
    GraphSource::new(session, employee).accept(&mut badge).expect("traversal succeeds");
    // The employee id shadows the person id; the accessor still reads its own level.
    assert_eq!(badge.lines, ["1001 Ada Engineer Ada (7)"]);
}

#[rstest]
fn callback_failures_name_the_binding(session: Arc<Session>) {
    struct Refuses;

    impl Visitor for Refuses {
        fn visit_end(&mut self) {}
    }

    impl Bind<Graph> for Refuses {
        fn bind(bindings: &mut TableBuilder<Graph, Self>) {
            bindings.bind("children[]", [], |_: &mut Refuses| -> Result<(), String> { Err("no children".into()) });
        }
    }

    let root = Node::new("root", vec![Node::new("c", Vec::new())]);
    let err = GraphSource::new(session, root).accept(&mut Refuses).expect_err("must fail");
    assert!(matches!(err.kind(), BindingError::Invocation(_)));
    assert_eq!(err.to_string(), "visitor callback failed: no children at `children[]`");
}

#[rstest]
fn repeated_traversals_reuse_tables(session: Arc<Session>) {
    let log = Log::default();
    let root = Node::new("root", vec![Node::new("c0", Vec::new())]);
    let source = GraphSource::new(Arc::clone(&session), Arc::clone(&root));
    source.register::<Tree>().expect("registers");
    source.accept(&mut Tree { log: Arc::clone(&log) }).expect("first traversal");
    let builds = session.builds();

    GraphSource::new(Arc::clone(&session), root).accept(&mut Tree { log }).expect("second traversal");
    assert_eq!(session.builds(), builds);
}
