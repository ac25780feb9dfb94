use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;

use crate::binding::{BuiltTable, TableBuilder};
use crate::error::BindingError;
use crate::source::SourceKind;

/// Callback target of a traversal.
///
/// Bound callbacks are declared through [`Bind`]; `visit_end` closes the
/// scope the visitor was installed for.
pub trait Visitor: Any {
    fn visit_end(&mut self);
}

/// Declares the bindings of a visitor type for one source kind.
///
/// ```
/// use pathbind_core::{Bind, SourceKind, TableBuilder, Visitor};
///
/// struct Counter {
///     items: usize,
/// }
///
/// impl Visitor for Counter {
///     fn visit_end(&mut self) {}
/// }
///
/// impl<K: SourceKind> Bind<K> for Counter {
///     fn bind(bindings: &mut TableBuilder<K, Self>) {
///         bindings.bind("/list/item", [], |counter: &mut Counter| counter.items += 1);
///     }
/// }
/// ```
pub trait Bind<K: SourceKind>: Visitor + Sized {
    fn bind(bindings: &mut TableBuilder<K, Self>);
}

/// Runtime identity of a bindable visitor type plus its table constructor.
pub struct VisitorType<K: SourceKind> {
    id: TypeId,
    name: &'static str,
    build: fn() -> Result<BuiltTable<K>, BindingError>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: SourceKind> VisitorType<K> {
    pub fn of<V: Bind<K>>() -> Self {
        Self { id: TypeId::of::<V>(), name: type_name::<V>(), build: build_table::<K, V>, _kind: PhantomData }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn build(&self) -> Result<BuiltTable<K>, BindingError> {
        (self.build)()
    }
}

fn build_table<K: SourceKind, V: Bind<K>>() -> Result<BuiltTable<K>, BindingError> {
    let mut builder = TableBuilder::<K, V>::new();
    V::bind(&mut builder);
    builder.finish()
}

impl<K: SourceKind> Clone for VisitorType<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: SourceKind> Copy for VisitorType<K> {}

impl<K: SourceKind> PartialEq for VisitorType<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<K: SourceKind> Eq for VisitorType<K> {}

impl<K: SourceKind> fmt::Debug for VisitorType<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitorType").field("kind", &K::NAME).field("name", &self.name).finish()
    }
}

/// A visitor produced by a callback, installed for the matched scope.
pub struct Nested<K: SourceKind> {
    visitor: Box<dyn Visitor>,
    ty: VisitorType<K>,
}

impl<K: SourceKind> Nested<K> {
    pub fn new<V: Bind<K>>(visitor: V) -> Self {
        Self { visitor: Box::new(visitor), ty: VisitorType::of::<V>() }
    }

    pub fn visitor_type(&self) -> VisitorType<K> {
        self.ty
    }

    pub fn into_parts(self) -> (Box<dyn Visitor>, VisitorType<K>) {
        (self.visitor, self.ty)
    }
}

impl<K: SourceKind> fmt::Debug for Nested<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nested").field("type", &self.ty.name).finish_non_exhaustive()
    }
}

/// Downcasts a type-erased visitor back to its concrete type.
pub(crate) fn downcast_visitor<'a, V: Visitor>(visitor: &'a mut (dyn Visitor + 'static)) -> Option<&'a mut V> {
    let any: &mut dyn Any = visitor;
    any.downcast_mut::<V>()
}
