use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core value type for positional arguments and column values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    /// An unsigned argument above `i64::MAX`; drivers refuse to bind it.
    Unsigned(u64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Build a `Vec<Value>` of positional arguments.
///
/// ```
/// use rust_sqlquery::{args, Value};
/// let args = args![1, "two", None::<i64>];
/// assert_eq!(args, vec![Value::Integer(1), Value::Text("two".into()), Value::Null]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Value::Unsigned(value), Value::Integer)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::from(value as u64)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(f64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Blob(value.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Failure to coerce a column value into a destination type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("cannot convert {from} into {to}")]
    Incompatible { from: &'static str, to: &'static str },

    #[error("unexpected NULL for {to}")]
    UnexpectedNull { to: &'static str },

    #[error("value {value} out of range for {to}")]
    OutOfRange { value: i128, to: &'static str },

    #[error("cannot parse {text:?} as {to}")]
    Parse { text: String, to: &'static str },

    #[error("blob is not valid UTF-8")]
    InvalidUtf8,
}

/// Coercion from a column value into a destination.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

fn integer_of(value: &Value, to: &'static str) -> Result<i128, ConversionError> {
    match value {
        Value::Integer(v) => Ok(i128::from(*v)),
        Value::Unsigned(v) => Ok(i128::from(*v)),
        Value::Boolean(v) => Ok(i128::from(*v)),
        Value::Text(text) => text.trim().parse::<i128>().map_err(|_| ConversionError::Parse {
            text: text.clone(),
            to,
        }),
        Value::Null => Err(ConversionError::UnexpectedNull { to }),
        other => Err(ConversionError::Incompatible {
            from: other.kind(),
            to,
        }),
    }
}

macro_rules! from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let wide = integer_of(value, stringify!($t))?;
                    <$t>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                        value: wide,
                        to: stringify!($t),
                    })
                }
            }
        )*
    };
}

from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Real(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            Value::Unsigned(v) => Ok(*v as f64),
            Value::Text(text) => text.trim().parse::<f64>().map_err(|_| ConversionError::Parse {
                text: text.clone(),
                to: "f64",
            }),
            Value::Null => Err(ConversionError::UnexpectedNull { to: "f64" }),
            other => Err(ConversionError::Incompatible {
                from: other.kind(),
                to: "f64",
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Boolean(v) => Ok(*v),
            Value::Integer(v) => Ok(*v != 0),
            Value::Unsigned(v) => Ok(*v != 0),
            Value::Text(text) => match text.trim() {
                "1" | "true" | "TRUE" => Ok(true),
                "0" | "false" | "FALSE" => Ok(false),
                _ => Err(ConversionError::Parse {
                    text: text.clone(),
                    to: "bool",
                }),
            },
            Value::Null => Err(ConversionError::UnexpectedNull { to: "bool" }),
            other => Err(ConversionError::Incompatible {
                from: other.kind(),
                to: "bool",
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(text) => Ok(text.clone()),
            Value::Integer(v) => Ok(v.to_string()),
            Value::Unsigned(v) => Ok(v.to_string()),
            Value::Real(v) => Ok(v.to_string()),
            Value::Boolean(v) => Ok(v.to_string()),
            Value::Blob(bytes) => {
                String::from_utf8(bytes.clone()).map_err(|_| ConversionError::InvalidUtf8)
            }
            Value::Null => Err(ConversionError::UnexpectedNull { to: "String" }),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Blob(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(text.as_bytes().to_vec()),
            Value::Null => Err(ConversionError::UnexpectedNull { to: "Vec<u8>" }),
            other => Err(ConversionError::Incompatible {
                from: other.kind(),
                to: "Vec<u8>",
            }),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(u8::from_value(&Value::Integer(255)), Ok(255));
        assert_eq!(
            u8::from_value(&Value::Integer(256)),
            Err(ConversionError::OutOfRange { value: 256, to: "u8" })
        );
        assert!(u64::from_value(&Value::Integer(-1)).is_err());
    }

    #[test]
    fn integers_parse_text_but_not_reals() {
        assert_eq!(i32::from_value(&Value::Text(" 42 ".into())), Ok(42));
        assert!(matches!(
            i64::from_value(&Value::Real(1.5)),
            Err(ConversionError::Incompatible { from: "real", .. })
        ));
    }

    #[test]
    fn null_needs_an_option() {
        assert_eq!(
            i64::from_value(&Value::Null),
            Err(ConversionError::UnexpectedNull { to: "i64" })
        );
        assert_eq!(Option::<i64>::from_value(&Value::Null), Ok(None));
        assert_eq!(Option::<i64>::from_value(&Value::Integer(7)), Ok(Some(7)));
    }

    #[test]
    fn text_and_bytes_cross_convert() {
        assert_eq!(Vec::<u8>::from_value(&Value::Text("ab".into())), Ok(b"ab".to_vec()));
        assert_eq!(String::from_value(&Value::Blob(b"cd".to_vec())), Ok("cd".to_string()));
        assert_eq!(
            String::from_value(&Value::Blob(vec![0xff, 0xfe])),
            Err(ConversionError::InvalidUtf8)
        );
        assert_eq!(String::from_value(&Value::Integer(3)), Ok("3".to_string()));
    }

    #[test]
    fn booleans_accept_integers_and_words() {
        assert_eq!(bool::from_value(&Value::Integer(2)), Ok(true));
        assert_eq!(bool::from_value(&Value::Text("false".into())), Ok(false));
        assert!(bool::from_value(&Value::Text("maybe".into())).is_err());
    }

    #[test]
    fn args_macro_converts_each_argument() {
        let args = crate::args![1u8, 2.5, true, "x", Some(b"y".to_vec())];
        assert_eq!(
            args,
            vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Boolean(true),
                Value::Text("x".to_string()),
                Value::Blob(b"y".to_vec()),
            ]
        );
        assert!(crate::args![].is_empty());
    }

    #[test]
    fn wide_unsigned_is_kept_exact() {
        assert_eq!(Value::from(7u64), Value::Integer(7));
        assert_eq!(Value::from(i64::MAX as u64), Value::Integer(i64::MAX));
        assert_eq!(Value::from(u64::MAX), Value::Unsigned(u64::MAX));
        assert_ne!(Value::from(u64::MAX), Value::Integer(i64::MAX));
        assert_eq!(u64::from_value(&Value::Unsigned(u64::MAX)), Ok(u64::MAX));
        assert_eq!(
            i64::from_value(&Value::Unsigned(u64::MAX)),
            Err(ConversionError::OutOfRange {
                value: i128::from(u64::MAX),
                to: "i64"
            })
        );
    }
}
