use std::sync::Arc;

use pathbind_core::{
    Bind, BindingError, BindingTable, MethodBinding, Session, Source, TraversalError, ValueType, Visitor,
};
use tracing::{debug, trace};

use crate::Graph;
use crate::cache::PropertyCache;
use crate::path::{GraphPath, Step, parse_param};
use crate::schema::PropertyKind;
use crate::value::Value;

/// An in-memory object graph traversed by relative property paths.
pub struct GraphSource {
    session: Arc<Session>,
    root: Value,
}

impl GraphSource {
    pub fn new(session: Arc<Session>, root: impl Into<Value>) -> Self {
        Self { session, root: root.into() }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

impl Source for GraphSource {
    type Kind = Graph;

    fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn accept<V: Bind<Graph>>(self, visitor: &mut V) -> Result<(), TraversalError> {
        let table = self.session.register::<Graph, V>()?;
        let mut walk = GraphWalk { session: &self.session, properties: PropertyCache::default(), invocations: 0 };
        walk.visit(&self.root, visitor, &table)?;
        visitor.visit_end();
        debug!(invocations = walk.invocations, "graph traversal finished");
        Ok(())
    }
}

struct GraphWalk<'s> {
    session: &'s Session,
    properties: PropertyCache,
    invocations: usize,
}

impl GraphWalk<'_> {
    /// Runs every binding of `table` against `object`.
    fn visit(
        &mut self,
        object: &Value,
        visitor: &mut (dyn Visitor + 'static),
        table: &BindingTable<Graph>,
    ) -> Result<(), TraversalError> {
        for binding in table.iter() {
            let fail = |kind: BindingError| TraversalError::new(kind).with_path(binding.key());
            let path = GraphPath::parse(binding.key()).map_err(fail)?;
            let target = self.resolve(object, path.steps()).map_err(fail)?;

            if path.is_iterating() {
                let Value::Array(items) = &target else {
                    return Err(fail(BindingError::NotIterable { type_name: target.type_name().to_owned() }));
                };
                for item in items {
                    self.invoke(binding, item, visitor)?;
                }
            } else {
                self.invoke(binding, &target, visitor)?;
            }
        }
        Ok(())
    }

    /// Calls `binding` with parameters read from `target`, then walks a
    /// produced visitor over `target`.
    fn invoke(
        &mut self,
        binding: &MethodBinding<Graph>,
        target: &Value,
        visitor: &mut (dyn Visitor + 'static),
    ) -> Result<(), TraversalError> {
        let fail = |kind: BindingError| TraversalError::new(kind).with_path(binding.key());

        let mut args = Vec::with_capacity(binding.arity());
        for param in binding.params() {
            let value = match parse_param(param.key()).map_err(fail)? {
                Some(step) => self.step(target, &step).map_err(fail)?,
                None => target.clone(),
            };
            if value.is_null() && !param.is_optional() && param.value_type() != ValueType::Object {
                return Err(fail(BindingError::ParameterConversion { text: None, expected: param.value_type() }));
            }
            args.push(value);
        }

        trace!(path = binding.key(), target = target.type_name(), "binding matched");
        self.invocations += 1;
        let Some(nested) = binding.invoke(visitor, args).map_err(|err| fail(BindingError::Invocation(err)))? else {
            return Ok(());
        };

        let (mut nested, ty) = nested.into_parts();
        let table = if binding.yields().requires_registration(&ty) {
            self.session.register_runtime_type(ty)
        } else {
            self.session.get_or_build(ty)
        }
        .map_err(fail)?;
        self.accept_nested(target, nested.as_mut(), &table)
    }

    fn accept_nested(
        &mut self,
        target: &Value,
        visitor: &mut (dyn Visitor + 'static),
        table: &BindingTable<Graph>,
    ) -> Result<(), TraversalError> {
        match target {
            Value::Array(items) => {
                for item in items {
                    self.visit(item, visitor, table)?;
                }
                if !items.is_empty() {
                    visitor.visit_end();
                }
            }
            Value::Null => visitor.visit_end(),
            object => {
                self.visit(object, visitor, table)?;
                visitor.visit_end();
            }
        }
        Ok(())
    }

    fn resolve(&mut self, object: &Value, steps: &[Step]) -> Result<Value, BindingError> {
        let mut current = object.clone();
        for step in steps {
            current = self.step(&current, step)?;
        }
        Ok(current)
    }

    fn step(&mut self, value: &Value, step: &Step) -> Result<Value, BindingError> {
        let unresolved = || BindingError::UnresolvedPath {
            segment: step.to_string(),
            type_name: value.type_name().to_owned(),
        };
        match value {
            Value::Object(object) => {
                let schema = object.schema();
                let handle = self.properties.lookup(schema, step.kind(), step.name()).ok_or_else(unresolved)?;
                schema.read(object.as_any(), step.kind(), handle).ok_or_else(unresolved)
            }
            Value::Array(items) if step.kind() == PropertyKind::Field && step.name() == "length" => {
                Ok(items.len().into())
            }
            _ => Err(unresolved()),
        }
    }
}
