//! Path-bound visitor binding for structured inputs.
//!
//! A visitor type declares which callbacks fire for which path keys; the
//! resulting [`BindingTable`] is built once per source kind and cached in a
//! [`Session`]. Traversal strategies (document events, object graphs) live in
//! their own crates and implement [`Source`].

mod binding;
mod error;
mod session;
mod source;
mod value_type;
mod visitor;

pub use binding::{
    BindingTable, CallbackResult, Declaration, Handler, IntoOutcome, MethodBinding, ParamBinding,
    ParamSpec, TableBuilder, Yields,
};
pub use error::{BindingError, CallbackError, Location, TraversalError};
pub use session::Session;
pub use source::{Source, SourceKind};
pub use value_type::{ArgumentError, FromArg, ValueType, convert_arg};
pub use visitor::{Bind, Nested, Visitor, VisitorType};
