use std::sync::Arc;

use crate::error::{BindingError, TraversalError};
use crate::session::Session;
use crate::visitor::Bind;

/// A traversal strategy and its path-key grammar.
///
/// Binding tables are cached per `(SourceKind, visitor type)`, so the same
/// visitor type may carry independent bindings for different kinds.
pub trait SourceKind: Send + Sync + 'static {
    /// Stable name used in diagnostics.
    const NAME: &'static str;

    /// Resolved parameter value handed to callbacks.
    type Arg: 'static;

    /// Canonical form of a declared binding path.
    fn normalize_key(raw: &str) -> Result<String, BindingError>;

    /// Canonical form of a declared parameter path.
    fn normalize_param(raw: &str) -> Result<String, BindingError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(BindingError::invalid_key(raw, "empty parameter key"));
        }
        Ok(key.to_owned())
    }
}

/// A single-use structured input that can be traversed with a visitor.
pub trait Source: Sized {
    type Kind: SourceKind;

    fn session(&self) -> &Arc<Session>;

    /// Builds and caches the binding table of `V` ahead of traversal.
    ///
    /// Registering an already known type has no effect.
    fn register<V: Bind<Self::Kind>>(&self) -> Result<(), TraversalError> {
        self.session().register::<Self::Kind, V>()?;
        Ok(())
    }

    /// Traverses the input, invoking the bindings of `visitor`.
    fn accept<V: Bind<Self::Kind>>(self, visitor: &mut V) -> Result<(), TraversalError>;
}
