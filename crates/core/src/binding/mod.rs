//! Binding declaration and the immutable per-visitor binding tables.

mod builder;
mod handler;
mod table;

pub use builder::{Declaration, TableBuilder};
pub(crate) use builder::BuiltTable;
pub use handler::{CallbackResult, Handler, IntoOutcome, ParamSpec};
pub use table::{BindingTable, MethodBinding, ParamBinding, Yields};
