//! Explicit property tables standing in for runtime reflection.
//!
//! A [`Schema`] lists the readable fields and zero-argument accessors of one
//! bean type, plus an optional parent schema for the embedded base value
//! the type extends.

use std::any::Any;
use std::fmt;

use crate::value::Value;

type Reader = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Projection = Box<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// Whether a path segment names a field or an accessor (`name()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Field,
    Accessor,
}

struct Property {
    name: &'static str,
    read: Reader,
}

struct Parent {
    schema: &'static Schema,
    project: Projection,
}

/// Readable properties of one bean type.
pub struct Schema {
    name: &'static str,
    fields: Vec<Property>,
    accessors: Vec<Property>,
    parent: Option<Parent>,
}

/// Location of a property: hierarchy depth of the declaring schema and the
/// property's position there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handle {
    pub(crate) depth: usize,
    pub(crate) index: usize,
}

impl Schema {
    pub fn builder<T: Any>(name: &'static str) -> SchemaBuilder<T> {
        SchemaBuilder {
            schema: Schema { name, fields: Vec::new(), accessors: Vec::new(), parent: None },
            _type: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static Schema> {
        self.parent.as_ref().map(|parent| parent.schema)
    }

    /// Names of the properties declared on this level, excluding ancestors.
    pub fn properties(&self, kind: PropertyKind) -> impl Iterator<Item = &'static str> + '_ {
        self.level(kind).iter().map(|property| property.name)
    }

    /// Schema `depth` levels up the hierarchy, `self` at depth zero.
    pub(crate) fn ancestor(&self, depth: usize) -> Option<&Schema> {
        let mut schema = self;
        for _ in 0..depth {
            schema = schema.parent()?;
        }
        Some(schema)
    }

    pub(crate) fn read(&self, object: &dyn Any, kind: PropertyKind, handle: Handle) -> Option<Value> {
        let mut schema = self;
        let mut current = object;
        for _ in 0..handle.depth {
            let parent = schema.parent.as_ref()?;
            current = (parent.project)(current)?;
            schema = parent.schema;
        }
        let property = schema.level(kind).get(handle.index)?;
        (property.read)(current)
    }

    fn level(&self, kind: PropertyKind) -> &[Property] {
        match kind {
            PropertyKind::Field => &self.fields,
            PropertyKind::Accessor => &self.accessors,
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.properties(PropertyKind::Field).collect::<Vec<_>>())
            .field("accessors", &self.properties(PropertyKind::Accessor).collect::<Vec<_>>())
            .field("parent", &self.parent().map(Schema::name))
            .finish()
    }
}

/// Declares the properties of bean type `T`.
///
/// ```
/// use std::sync::LazyLock;
///
/// use pathbind_graph::{Schema, Value};
///
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// static POINT: LazyLock<Schema> = LazyLock::new(|| {
///     Schema::builder::<Point>("Point")
///         .field("x", |point| point.x.into())
///         .field("y", |point| point.y.into())
///         .accessor("norm", |point| (point.x.abs() + point.y.abs()).into())
///         .build()
/// });
/// # assert_eq!(POINT.name(), "Point");
/// ```
pub struct SchemaBuilder<T> {
    schema: Schema,
    _type: std::marker::PhantomData<fn(&T)>,
}

impl<T: Any> SchemaBuilder<T> {
    pub fn field(mut self, name: &'static str, read: impl Fn(&T) -> Value + Send + Sync + 'static) -> Self {
        self.schema.fields.push(Property { name, read: reader(read) });
        self
    }

    pub fn accessor(mut self, name: &'static str, read: impl Fn(&T) -> Value + Send + Sync + 'static) -> Self {
        self.schema.accessors.push(Property { name, read: reader(read) });
        self
    }

    /// Makes `parent` the next level of the hierarchy; its properties are
    /// read from the value `project` returns.
    pub fn extends<P: Any>(mut self, parent: &'static Schema, project: fn(&T) -> &P) -> Self {
        self.schema.parent = Some(Parent { schema: parent, project: projection(project) });
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

fn reader<T: Any>(read: impl Fn(&T) -> Value + Send + Sync + 'static) -> Reader {
    Box::new(move |object: &dyn Any| object.downcast_ref::<T>().map(&read))
}

fn projection<T: Any, P: Any>(project: fn(&T) -> &P) -> Projection {
    fn constrain<F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any>>(f: F) -> F {
        f
    }
    Box::new(constrain(move |object| object.downcast_ref::<T>().map(|value| project(value) as &dyn Any)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::LazyLock;

    struct Base {
        id: i64,
    }

    struct Derived {
        base: Base,
        id: i64,
    }

    static BASE: LazyLock<Schema> = LazyLock::new(|| {
        Schema::builder::<Base>("Base")
            .field("id", |base| base.id.into())
            .field("kind", |_| "base".into())
            .build()
    });

    static DERIVED: LazyLock<Schema> = LazyLock::new(|| {
        Schema::builder::<Derived>("Derived")
            .field("id", |derived| derived.id.into())
            .extends(&BASE, |derived| &derived.base)
            .build()
    });

    #[rstest]
    fn reads_through_the_hierarchy() {
        let derived = Derived { base: Base { id: 1 }, id: 2 };
        let own = DERIVED.read(&derived, PropertyKind::Field, Handle { depth: 0, index: 0 });
        let inherited = DERIVED.read(&derived, PropertyKind::Field, Handle { depth: 1, index: 0 });
        assert!(matches!(own, Some(Value::Integer(2))));
        assert!(matches!(inherited, Some(Value::Integer(1))));
    }

    #[rstest]
    fn wrong_object_type_reads_nothing() {
        let base = Base { id: 1 };
        assert!(DERIVED.read(&base, PropertyKind::Field, Handle { depth: 0, index: 0 }).is_none());
    }

    #[rstest]
    fn ancestors_end_at_the_root_schema() {
        assert_eq!(DERIVED.ancestor(1).map(Schema::name), Some("Base"));
        assert!(DERIVED.ancestor(2).is_none());
        assert_eq!(DERIVED.properties(PropertyKind::Field).collect::<Vec<_>>(), ["id"]);
    }
}
