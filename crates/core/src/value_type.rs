use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Declared target type of a bound callback parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Char,
    String,
    /// Source specific value passed through unconverted.
    Object,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Byte => "byte",
            ValueType::Short => "short",
            ValueType::Integer => "integer",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Char => "char",
            ValueType::String => "string",
            ValueType::Object => "object",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved argument did not fit the Rust type of the callback parameter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("argument {index}: expected {expected}, found {found}")]
pub struct ArgumentError {
    pub index: usize,
    pub expected: ValueType,
    pub found: &'static str,
}

/// Conversion from a source specific argument value into a callback
/// parameter type.
///
/// `VALUE_TYPE` is what the parameter binding declares; the source resolves
/// the raw input to that type before the conversion runs, so `from_arg` only
/// fails when a source hands over a value of an unexpected shape.
pub trait FromArg<A>: Sized {
    const VALUE_TYPE: ValueType;
    const OPTIONAL: bool = false;

    /// Converts the argument, reporting the name of the shape that was found
    /// on mismatch.
    fn from_arg(arg: A) -> Result<Self, &'static str>;
}

/// Converts argument `index`, attaching the position on failure.
pub fn convert_arg<A, T: FromArg<A>>(index: usize, arg: A) -> Result<T, ArgumentError> {
    T::from_arg(arg).map_err(|found| ArgumentError { index, expected: T::VALUE_TYPE, found })
}
