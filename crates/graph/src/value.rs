use std::any::Any;
use std::fmt;
use std::sync::Arc;

use pathbind_core::{FromArg, ValueType};

use crate::schema::Schema;

/// A node of an in-memory object graph that exposes its properties through
/// a [`Schema`].
pub trait Bean: Any + Send + Sync + fmt::Debug {
    fn schema(&self) -> &'static Schema;
}

/// Shared handle to a bean.
#[derive(Clone)]
pub struct Object(Arc<dyn Bean>);

impl Object {
    pub fn new<B: Bean>(bean: B) -> Self {
        Self(Arc::new(bean))
    }

    pub fn schema(&self) -> &'static Schema {
        self.0.schema()
    }

    pub fn as_any(&self) -> &dyn Any {
        let bean: &dyn Bean = &*self.0;
        bean
    }

    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// The shared bean, if it is a `T`.
    pub fn downcast<T: Bean>(&self) -> Option<Arc<T>> {
        let shared: Arc<dyn Any + Send + Sync> = self.0.clone();
        shared.downcast().ok()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<B: Bean> From<Arc<B>> for Object {
    fn from(bean: Arc<B>) -> Self {
        Self(bean)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

/// A property value read from a bean.
///
/// Arrays stand for every iterable collection of the source graph.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Char(char),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn object<B: Bean>(bean: B) -> Self {
        Value::Object(Object::new(bean))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Schema name for objects, the value kind otherwise.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(object) => object.schema().name(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$value:ident| $convert:expr;)*) => {
        $(
            impl From<$ty> for Value {
                fn from($value: $ty) -> Self {
                    $convert
                }
            }
        )*
    };
}

value_from! {
    bool => |value| Value::Bool(value);
    i8 => |value| Value::Integer(value.into());
    i16 => |value| Value::Integer(value.into());
    i32 => |value| Value::Integer(value.into());
    i64 => |value| Value::Integer(value);
    u8 => |value| Value::Integer(value.into());
    u16 => |value| Value::Integer(value.into());
    u32 => |value| Value::Integer(value.into());
    usize => |value| Value::Integer(i64::try_from(value).unwrap_or(i64::MAX));
    f32 => |value| Value::Number(value.into());
    f64 => |value| Value::Number(value);
    char => |value| Value::Char(value);
    String => |value| Value::String(value);
    &str => |value| Value::String(value.to_owned());
    Object => |value| Value::Object(value);
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<B: Bean> From<Arc<B>> for Value {
    fn from(bean: Arc<B>) -> Self {
        Value::Object(bean.into())
    }
}

macro_rules! integer_from_value {
    ($($ty:ty => $value_type:ident;)*) => {
        $(
            impl FromArg<Value> for $ty {
                const VALUE_TYPE: ValueType = ValueType::$value_type;

                fn from_arg(arg: Value) -> Result<Self, &'static str> {
                    match arg {
                        Value::Integer(value) => <$ty>::try_from(value).map_err(|_| "out of range integer"),
                        other => Err(other.type_name()),
                    }
                }
            }
        )*
    };
}

integer_from_value! {
    i8 => Byte;
    i16 => Short;
    i32 => Integer;
    i64 => Long;
}

impl FromArg<Value> for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Bool(value) => Ok(value),
            other => Err(other.type_name()),
        }
    }
}

impl FromArg<Value> for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    #[allow(clippy::cast_precision_loss)]
    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Number(value) => Ok(value),
            Value::Integer(value) => Ok(value as f64),
            other => Err(other.type_name()),
        }
    }
}

impl FromArg<Value> for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    #[allow(clippy::cast_possible_truncation)]
    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        f64::from_arg(arg).map(|value| value as f32)
    }
}

impl FromArg<Value> for char {
    const VALUE_TYPE: ValueType = ValueType::Char;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Char(value) => Ok(value),
            other => Err(other.type_name()),
        }
    }
}

impl FromArg<Value> for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::String(value) => Ok(value),
            other => Err(other.type_name()),
        }
    }
}

impl FromArg<Value> for Value {
    const VALUE_TYPE: ValueType = ValueType::Object;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        Ok(arg)
    }
}

impl FromArg<Value> for Object {
    const VALUE_TYPE: ValueType = ValueType::Object;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Object(object) => Ok(object),
            other => Err(other.type_name()),
        }
    }
}

impl FromArg<Value> for Vec<Value> {
    const VALUE_TYPE: ValueType = ValueType::Object;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Array(items) => Ok(items),
            other => Err(other.type_name()),
        }
    }
}

impl<B: Bean> FromArg<Value> for Arc<B> {
    const VALUE_TYPE: ValueType = ValueType::Object;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match &arg {
            Value::Object(object) => object.downcast().ok_or("object of another type"),
            other => Err(other.type_name()),
        }
    }
}

impl<T: FromArg<Value>> FromArg<Value> for Option<T> {
    const VALUE_TYPE: ValueType = T::VALUE_TYPE;
    const OPTIONAL: bool = true;

    fn from_arg(arg: Value) -> Result<Self, &'static str> {
        match arg {
            Value::Null => Ok(None),
            other => T::from_arg(other).map(Some),
        }
    }
}
