//! Graph-path traversal of in-memory object graphs.
//!
//! Binding keys are property paths relative to the object being visited:
//! `this`, `owner.name`, `lines()[]`. A segment ending in `()` reads an
//! accessor instead of a field; a final `[]` fires the binding once per
//! element. Parameter keys name one property of the matched object, or
//! `this` for the object itself.
//!
//! Types take part by implementing [`Bean`] and describing their properties
//! with a [`Schema`].

mod cache;
mod path;
mod schema;
mod source;
mod value;

use pathbind_core::{BindingError, SourceKind};

pub use path::{GraphPath, Step, parse_param};
pub use schema::{PropertyKind, Schema, SchemaBuilder};
pub use source::GraphSource;
pub use value::{Bean, Object, Value};

/// Source kind of object graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Graph;

impl SourceKind for Graph {
    const NAME: &'static str = "graph";
    type Arg = Value;

    fn normalize_key(raw: &str) -> Result<String, BindingError> {
        GraphPath::parse(raw).map(|path| path.to_string())
    }

    fn normalize_param(raw: &str) -> Result<String, BindingError> {
        Ok(parse_param(raw)?.map_or_else(|| "this".to_owned(), |step| step.to_string()))
    }
}
