//! Event-driven traversal state machine.
//!
//! [`TreeWalker`] consumes the four tree events of a document and keeps one
//! frame per open node. A frame either passes the enclosing visitor through
//! or owns the visitor a matched binding produced for its sub-tree; that
//! visitor's `visit_end` fires when the frame is popped.

use std::sync::Arc;

use pathbind_core::{
    Bind, BindingError, BindingTable, Location, MethodBinding, Nested, Session, TraversalError, Visitor,
};
use tracing::trace;

use crate::Xml;
use crate::error::DocumentError;
use crate::scalar::{Scalar, convert};

/// Reports the input position of the event being processed.
pub trait Locator {
    fn location(&self) -> Location;
}

impl<F: Fn() -> Location> Locator for F {
    fn location(&self) -> Location {
        self()
    }
}

/// Attributes of an element in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, value)| value.as_str())
    }

    /// Text for parameter `index` bound to `key`: the attribute named `key`,
    /// else the attribute at position `index`.
    ///
    /// The positional fallback does not check the attribute's name, so a
    /// missing named attribute picks up whichever attribute sits at that
    /// position. Parameters that may be absent should not rely on it.
    pub fn lookup(&self, key: &str, index: usize) -> Option<&str> {
        self.get(key).or_else(|| self.get_index(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect() }
    }
}

struct Scope {
    visitor: Box<dyn Visitor>,
    table: Arc<BindingTable<Xml>>,
}

struct Frame {
    name: String,
    scope: Option<Scope>,
}

/// Matches absolute element paths against the binding tables of the
/// visitors in effect.
pub struct TreeWalker<'v> {
    session: Arc<Session>,
    root: &'v mut (dyn Visitor + 'static),
    root_table: Arc<BindingTable<Xml>>,
    frames: Vec<Frame>,
    locator: Option<Box<dyn Locator + 'v>>,
    ended: bool,
}

impl<'v> TreeWalker<'v> {
    /// Prepares a walk with `visitor` as the root visitor, building its table
    /// through `session` if needed.
    pub fn new<V: Bind<Xml>>(session: Arc<Session>, visitor: &'v mut V) -> Result<Self, TraversalError> {
        let root_table = session.register::<Xml, V>()?;
        Ok(Self { session, root: visitor, root_table, frames: Vec::new(), locator: None, ended: false })
    }

    pub fn document_start(&mut self, locator: impl Locator + 'v) {
        self.locator = Some(Box::new(locator));
    }

    /// Absolute path of the innermost open element, `/` if none is open.
    pub fn path(&self) -> String {
        if self.frames.is_empty() {
            return "/".to_owned();
        }
        self.frames.iter().fold(String::new(), |mut path, frame| {
            path.push('/');
            path.push_str(&frame.name);
            path
        })
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn node_enter(&mut self, name: &str, attributes: &Attributes) -> Result<(), TraversalError> {
        if self.ended {
            return Err(self.fail(BindingError::input(DocumentError::AfterEnd(name.to_owned())), name));
        }
        self.frames.push(Frame { name: name.to_owned(), scope: None });
        let path = self.path();

        let table = Arc::clone(self.current_table());
        let Some(binding) = table.get(&path) else {
            return Ok(());
        };
        trace!(path = %path, visitor = table.visitor_name(), "binding matched");

        let args = resolve_args(binding, attributes).map_err(|err| self.fail(err, &path))?;
        let outcome = binding
            .invoke(self.current_visitor(), args)
            .map_err(|err| self.fail(BindingError::Invocation(err), &path))?;

        if let Some(nested) = outcome {
            let scope = self.install(binding, nested).map_err(|err| self.fail(err, &path))?;
            trace!(path = %path, visitor = scope.table.visitor_name(), "scope opened");
            if let Some(frame) = self.frames.last_mut() {
                frame.scope = Some(scope);
            }
        }
        Ok(())
    }

    pub fn node_exit(&mut self, name: &str) -> Result<(), TraversalError> {
        let Some(frame) = self.frames.pop() else {
            return Err(self.fail(BindingError::input(DocumentError::UnexpectedEnd(name.to_owned())), name));
        };
        if let Some(mut scope) = frame.scope {
            trace!(name = %frame.name, visitor = scope.table.visitor_name(), "scope closed");
            scope.visitor.visit_end();
        }
        Ok(())
    }

    /// Ends the root visitor's scope; every element must have been closed.
    pub fn document_end(&mut self) -> Result<(), TraversalError> {
        if !self.frames.is_empty() {
            let path = self.path();
            let open = DocumentError::Unclosed(self.frames.len());
            return Err(self.fail(BindingError::input(open), &path));
        }
        if self.ended {
            return Err(self.fail(BindingError::input(DocumentError::EndedTwice), "/"));
        }
        self.ended = true;
        self.root.visit_end();
        Ok(())
    }

    fn install(&self, binding: &MethodBinding<Xml>, nested: Nested<Xml>) -> Result<Scope, BindingError> {
        let (visitor, ty) = nested.into_parts();
        let table = if binding.yields().requires_registration(&ty) {
            self.session.register_runtime_type(ty)?
        } else {
            self.session.get_or_build(ty)?
        };
        Ok(Scope { visitor, table })
    }

    fn current_table(&self) -> &Arc<BindingTable<Xml>> {
        self.frames.iter().rev().find_map(|frame| frame.scope.as_ref()).map_or(&self.root_table, |scope| &scope.table)
    }

    fn current_visitor(&mut self) -> &mut (dyn Visitor + 'static) {
        match self.frames.iter_mut().rev().find_map(|frame| frame.scope.as_mut()) {
            Some(scope) => scope.visitor.as_mut(),
            None => &mut *self.root,
        }
    }

    fn fail(&self, kind: BindingError, path: &str) -> TraversalError {
        TraversalError::new(kind)
            .with_path(path)
            .with_location(self.locator.as_ref().map(|locator| locator.location()))
    }
}

fn resolve_args(binding: &MethodBinding<Xml>, attributes: &Attributes) -> Result<Vec<Scalar>, BindingError> {
    binding
        .params()
        .iter()
        .enumerate()
        .map(|(index, param)| {
            convert(attributes.lookup(param.key(), index), param.value_type(), param.is_optional())
        })
        .collect()
}
