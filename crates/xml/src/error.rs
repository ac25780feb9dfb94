use std::str::Utf8Error;

use thiserror::Error;

/// Structural problems of the event stream, reported as
/// [`BindingError::Input`](pathbind_core::BindingError::Input).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unexpected end of element `{0}`")]
    UnexpectedEnd(String),
    #[error("element `{0}` after end of document")]
    AfterEnd(String),
    #[error("document ended with {0} open element(s)")]
    Unclosed(usize),
    #[error("document ended twice")]
    EndedTwice,
    #[error("name is not valid UTF-8")]
    Name(#[source] Utf8Error),
}
