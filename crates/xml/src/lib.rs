//! Tree-event traversal of XML documents.
//!
//! Binding keys are absolute element paths (`/catalog/book`). Callback
//! parameters are read from the attributes of the matched element.
//!
//! ```
//! use std::sync::Arc;
//!
//! use pathbind_core::{Bind, Session, Source, TableBuilder, Visitor};
//! use pathbind_xml::{Xml, XmlSource};
//!
//! #[derive(Default)]
//! struct Totals {
//!     sum: i64,
//! }
//!
//! impl Visitor for Totals {
//!     fn visit_end(&mut self) {}
//! }
//!
//! impl Bind<Xml> for Totals {
//!     fn bind(bindings: &mut TableBuilder<Xml, Self>) {
//!         bindings.bind("order/line", ["amount"], |totals: &mut Totals, amount: i64| totals.sum += amount);
//!     }
//! }
//!
//! let xml = r#"<order><line amount="2"/><line amount="5"/></order>"#;
//! let mut totals = Totals::default();
//! XmlSource::from_str(Arc::new(Session::new()), xml).accept(&mut totals)?;
//! assert_eq!(totals.sum, 7);
//! # Ok::<(), pathbind_core::TraversalError>(())
//! ```

mod error;
mod scalar;
mod source;
mod walker;

use pathbind_core::{BindingError, SourceKind};

pub use error::DocumentError;
pub use scalar::{Scalar, convert};
pub use source::{XmlOptions, XmlSource};
pub use walker::{Attributes, Locator, TreeWalker};

/// Source kind of XML documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xml;

impl SourceKind for Xml {
    const NAME: &'static str = "xml";
    type Arg = Scalar;

    /// Trims the key, forces a leading `/` and strips a trailing `/`.
    fn normalize_key(raw: &str) -> Result<String, BindingError> {
        let trimmed = raw.trim();
        let body = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let body = body.strip_prefix('/').unwrap_or(body);
        if body.is_empty() {
            return Err(BindingError::invalid_key(raw, "element path is empty"));
        }
        Ok(format!("/{body}"))
    }
}
