//! Attribute text to callback argument conversion.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use pathbind_core::{BindingError, FromArg, ValueType};

/// A converted attribute value as handed to a bound callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// An absent attribute bound to an optional parameter.
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "boolean",
            Scalar::Byte(_) => "byte",
            Scalar::Short(_) => "short",
            Scalar::Int(_) => "integer",
            Scalar::Long(_) => "long",
            Scalar::Float(_) => "float",
            Scalar::Double(_) => "double",
            Scalar::Char(_) => "char",
            Scalar::Str(_) => "string",
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Byte(value) => write!(f, "{value}"),
            Scalar::Short(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Long(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Double(value) => write!(f, "{value}"),
            Scalar::Char(value) => write!(f, "{value}"),
            Scalar::Str(value) => f.write_str(value),
        }
    }
}

/// Converts attribute text (or its absence) to the declared parameter type.
///
/// Booleans accept `"true"` in any case and read everything else, including
/// an absent attribute, as `false`. Numeric and char targets read an absent
/// attribute as `"0"`. Optional targets receive [`Scalar::Null`] instead.
pub fn convert(text: Option<&str>, expected: ValueType, optional: bool) -> Result<Scalar, BindingError> {
    if text.is_none() && optional {
        return Ok(Scalar::Null);
    }
    let fail = || BindingError::ParameterConversion { text: text.map(str::to_owned), expected };

    match expected {
        ValueType::Boolean => Ok(Scalar::Bool(text.is_some_and(|text| text.eq_ignore_ascii_case("true")))),
        ValueType::Byte => parse(text, expected).map(Scalar::Byte),
        ValueType::Short => parse(text, expected).map(Scalar::Short),
        ValueType::Integer => parse(text, expected).map(Scalar::Int),
        ValueType::Long => parse(text, expected).map(Scalar::Long),
        ValueType::Float => parse_float(text, expected).map(Scalar::Float),
        ValueType::Double => parse_float(text, expected).map(Scalar::Double),
        ValueType::Char => text.unwrap_or("0").chars().next().map(Scalar::Char).ok_or_else(fail),
        ValueType::String | ValueType::Object => text.map(|text| Scalar::Str(text.to_owned())).ok_or_else(fail),
    }
}

fn parse<T: FromStr>(text: Option<&str>, expected: ValueType) -> Result<T, BindingError> {
    let text = text.unwrap_or("0");
    text.parse().map_err(|_| BindingError::ParameterConversion { text: Some(text.to_owned()), expected })
}

/// Decimal parse that ignores surrounding control and space characters.
/// Infinity and NaN are only accepted as `Infinity` and `NaN`.
fn parse_float<T: FromStr>(text: Option<&str>, expected: ValueType) -> Result<T, BindingError> {
    let raw = text.unwrap_or("0");
    let fail = || BindingError::ParameterConversion { text: Some(raw.to_owned()), expected };
    let trimmed = raw.trim_matches(|c: char| c <= ' ');
    let unsigned = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    let special = matches!(unsigned, "Infinity" | "NaN");
    if !special && unsigned.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return Err(fail());
    }
    trimmed.parse().map_err(|_| fail())
}

macro_rules! from_scalar {
    ($($ty:ty => $variant:ident, $value_type:ident;)*) => {
        $(
            impl FromArg<Scalar> for $ty {
                const VALUE_TYPE: ValueType = ValueType::$value_type;

                fn from_arg(arg: Scalar) -> Result<Self, &'static str> {
                    match arg {
                        Scalar::$variant(value) => Ok(value),
                        other => Err(other.type_name()),
                    }
                }
            }
        )*
    };
}

from_scalar! {
    bool => Bool, Boolean;
    i8 => Byte, Byte;
    i16 => Short, Short;
    i32 => Int, Integer;
    i64 => Long, Long;
    f32 => Float, Float;
    f64 => Double, Double;
    char => Char, Char;
    String => Str, String;
}

impl FromArg<Scalar> for Scalar {
    const VALUE_TYPE: ValueType = ValueType::Object;

    fn from_arg(arg: Scalar) -> Result<Self, &'static str> {
        Ok(arg)
    }
}

impl<T: FromArg<Scalar>> FromArg<Scalar> for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const OPTIONAL: bool = true;

    fn from_arg(arg: Scalar) -> Result<Self, &'static str> {
        match arg {
            Scalar::Null => Ok(None),
            other => T::from_arg(other).map(Some),
        }
    }
}
