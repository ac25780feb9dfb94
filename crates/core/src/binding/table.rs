use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binding::handler::CallbackResult;
use crate::error::BindingError;
use crate::source::SourceKind;
use crate::value_type::ValueType;
use crate::visitor::{Visitor, VisitorType};

pub(crate) type ErasedHandler<K> = Arc<
    dyn Fn(&mut (dyn Visitor + 'static), Vec<<K as SourceKind>::Arg>) -> CallbackResult<K> + Send + Sync,
>;

/// Declared return capability of a bound callback.
pub enum Yields<K: SourceKind> {
    /// The callback never produces a visitor.
    Nothing,
    /// The callback may produce a visitor whose type is only known at run time.
    Dynamic,
    /// The callback produces visitors of a statically known type.
    Visitor(VisitorType<K>),
}

impl<K: SourceKind> Yields<K> {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Yields::Nothing)
    }

    /// Whether a produced visitor of type `ty` still needs late registration.
    pub fn requires_registration(&self, ty: &VisitorType<K>) -> bool {
        match self {
            Yields::Visitor(known) => known != ty,
            Yields::Nothing | Yields::Dynamic => true,
        }
    }
}

impl<K: SourceKind> Clone for Yields<K> {
    fn clone(&self) -> Self {
        match self {
            Yields::Nothing => Yields::Nothing,
            Yields::Dynamic => Yields::Dynamic,
            Yields::Visitor(ty) => Yields::Visitor(*ty),
        }
    }
}

impl<K: SourceKind> fmt::Debug for Yields<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yields::Nothing => f.write_str("Nothing"),
            Yields::Dynamic => f.write_str("Dynamic"),
            Yields::Visitor(ty) => f.debug_tuple("Visitor").field(&ty.name()).finish(),
        }
    }
}

/// Where a callback parameter takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    key: String,
    value_type: ValueType,
    optional: bool,
}

impl ParamBinding {
    pub(crate) fn new(key: String, value_type: ValueType, optional: bool) -> Self {
        Self { key, value_type, optional }
    }

    /// Normalized sub-path key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Whether an absent value is handed to the callback as `None`.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// One bound callback: its key, parameter sources and invocable handle.
pub struct MethodBinding<K: SourceKind> {
    key: String,
    params: Vec<ParamBinding>,
    yields: Yields<K>,
    handler: ErasedHandler<K>,
}

impl<K: SourceKind> MethodBinding<K> {
    pub(crate) fn new(
        key: String,
        params: Vec<ParamBinding>,
        yields: Yields<K>,
        handler: ErasedHandler<K>,
    ) -> Self {
        Self { key, params, yields, handler }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn params(&self) -> &[ParamBinding] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn yields(&self) -> &Yields<K> {
        &self.yields
    }

    /// Calls the bound callback on `visitor` with already resolved arguments.
    pub fn invoke(&self, visitor: &mut (dyn Visitor + 'static), args: Vec<K::Arg>) -> CallbackResult<K> {
        (self.handler)(visitor, args)
    }
}

impl<K: SourceKind> fmt::Debug for MethodBinding<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("key", &self.key)
            .field("params", &self.params)
            .field("yields", &self.yields)
            .finish_non_exhaustive()
    }
}

/// Path key to binding map of one visitor type, immutable once built.
///
/// Iteration follows declaration order (own bindings first, then inherited
/// ones) so traversal traces are reproducible.
pub struct BindingTable<K: SourceKind> {
    visitor: &'static str,
    bindings: Vec<MethodBinding<K>>,
    index: HashMap<String, usize>,
}

impl<K: SourceKind> BindingTable<K> {
    pub(crate) fn new(visitor: &'static str) -> Self {
        Self { visitor, bindings: Vec::new(), index: HashMap::new() }
    }

    pub(crate) fn insert(&mut self, binding: MethodBinding<K>) {
        self.index.insert(binding.key.clone(), self.bindings.len());
        self.bindings.push(binding);
    }

    /// Name of the visitor type the table was built for.
    pub fn visitor_name(&self) -> &'static str {
        self.visitor
    }

    /// Exact lookup by normalized key.
    pub fn get(&self, key: &str) -> Option<&MethodBinding<K>> {
        self.index.get(key).map(|&position| &self.bindings[position])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Lookup by a key in declaration form, normalized first.
    pub fn resolve(&self, raw: &str) -> Result<Option<&MethodBinding<K>>, BindingError> {
        let key = K::normalize_key(raw)?;
        Ok(self.get(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodBinding<K>> {
        self.bindings.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(MethodBinding::key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: SourceKind> fmt::Debug for BindingTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingTable")
            .field("kind", &K::NAME)
            .field("visitor", &self.visitor)
            .field("bindings", &self.bindings)
            .finish()
    }
}
