//! Error taxonomy shared by all traversal strategies.
//!
//! [`BindingError`] names what went wrong; [`TraversalError`] is the single
//! wrapped error surfaced by [`Source::accept`](crate::Source::accept) and
//! [`Source::register`](crate::Source::register). It adds the offending path
//! key and, for document sources, the input location.

use std::error::Error;
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::value_type::ValueType;

/// Boxed error produced by a visitor callback.
pub type CallbackError = Box<dyn Error + Send + Sync + 'static>;

/// Failure categories of binding construction and traversal.
#[derive(Debug, Error)]
pub enum BindingError {
    /// A bound callback has more parameters than declared parameter keys.
    #[error("parameter {index} of binding `{key}` on {visitor} has no path key")]
    MissingParameterBinding { visitor: &'static str, key: String, index: usize },

    /// A binding declares more parameter keys than its callback accepts.
    #[error("binding `{key}` on {visitor} declares {declared} parameter keys for {arity} parameters")]
    SurplusParameterBinding { visitor: &'static str, key: String, declared: usize, arity: usize },

    /// Two bindings of the same visitor type normalize to the same key.
    #[error("binding `{key}` is declared twice on {visitor}")]
    DuplicateBinding { visitor: &'static str, key: String },

    /// A path key violates the grammar of its source kind.
    #[error("invalid path key `{key}`: {reason}")]
    InvalidPathKey { key: String, reason: &'static str },

    /// Attribute text cannot be converted to the declared scalar type.
    #[error("cannot convert {} to {expected}", display_text(.text.as_deref()))]
    ParameterConversion { text: Option<String>, expected: ValueType },

    /// A property path segment exists nowhere in the type hierarchy.
    #[error("cannot resolve `{segment}` on {type_name}")]
    UnresolvedPath { segment: String, type_name: String },

    /// An `[]` marked path resolved to a value that cannot be iterated.
    #[error("cannot iterate over {type_name}")]
    NotIterable { type_name: String },

    /// The bound callback itself failed.
    #[error("visitor callback failed: {0}")]
    Invocation(#[source] CallbackError),

    /// The structured input could not be read.
    #[error("malformed input: {0}")]
    Input(#[source] CallbackError),
}

impl BindingError {
    pub fn invalid_key(key: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPathKey { key: key.into(), reason }
    }

    pub fn input(err: impl Into<CallbackError>) -> Self {
        Self::Input(err.into())
    }
}

fn display_text(text: Option<&str>) -> String {
    match text {
        Some(text) => format!("`{text}`"),
        None => "absent value".to_owned(),
    }
}

/// Position inside a structured input, as far as the tokenizer tracks it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    /// 1-based line number.
    pub line: u64,
    /// Byte offset from the start of the input.
    pub position: u64,
}

impl Location {
    pub fn new(line: u64, position: u64) -> Self {
        Self { line, position }
    }
}

/// The single error surfaced by a failed registration or traversal.
#[derive(Debug)]
pub struct TraversalError {
    kind: BindingError,
    path: Option<String>,
    location: Option<Location>,
}

impl TraversalError {
    pub fn new(kind: BindingError) -> Self {
        Self { kind, path: None, location: None }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn kind(&self) -> &BindingError {
        &self.kind
    }

    /// Path key of the binding (or document position) that failed.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

impl From<BindingError> for TraversalError {
    fn from(kind: BindingError) -> Self {
        Self::new(kind)
    }
}

impl Display for TraversalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " at `{path}`")?;
        }
        if let Some(location) = self.location {
            write!(f, " (line {})", location.line)?;
        }
        Ok(())
    }
}

impl Error for TraversalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
    }
}
