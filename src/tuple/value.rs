use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::common::{DbError, Result};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value - can be any type
    Null,
    Boolean(bool),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    /// String value, stored in a `Char(n)` column
    String(String),
}

impl Value {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Widens any integral value to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(*v as i64),
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Writes exactly `data_type.fixed_size()` bytes. Nulls are written as
    /// zeros; the tuple's null bitmap records them.
    pub fn serialize(&self, data_type: &DataType, buf: &mut BytesMut) -> Result<()> {
        match (self, data_type) {
            (Value::Null, dt) => buf.put_bytes(0, dt.fixed_size()),
            (Value::Boolean(b), DataType::Boolean) => buf.put_u8(u8::from(*b)),
            (Value::SmallInt(v), DataType::SmallInt) => buf.put_i16_le(*v),
            (Value::Integer(v), DataType::Integer) => buf.put_i32_le(*v),
            (Value::BigInt(v), DataType::BigInt) => buf.put_i64_le(*v),
            (Value::Double(v), DataType::Double) => buf.put_f64_le(*v),

            // Widening coercions
            (Value::SmallInt(v), DataType::Integer) => buf.put_i32_le(*v as i32),
            (Value::SmallInt(v), DataType::BigInt) => buf.put_i64_le(*v as i64),
            (Value::Integer(v), DataType::BigInt) => buf.put_i64_le(*v as i64),

            (Value::String(s), DataType::Char(n)) => {
                let bytes = s.as_bytes();
                if bytes.len() > *n as usize {
                    return Err(DbError::TypeMismatch(format!(
                        "string of {} bytes does not fit CHAR({})",
                        bytes.len(),
                        n
                    )));
                }
                buf.put_u16_le(bytes.len() as u16);
                buf.put_slice(bytes);
                buf.put_bytes(0, *n as usize - bytes.len());
            }

            (value, dt) => {
                return Err(DbError::TypeMismatch(format!(
                    "cannot store {} in a {} column",
                    value, dt
                )))
            }
        }
        Ok(())
    }

    /// Reads one value of the given type, advancing the buffer by its width.
    pub fn deserialize(buf: &mut &[u8], data_type: &DataType) -> Result<Self> {
        if buf.remaining() < data_type.fixed_size() {
            return Err(DbError::InvalidPageData(format!(
                "need {} bytes for {}, have {}",
                data_type.fixed_size(),
                data_type,
                buf.remaining()
            )));
        }

        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::SmallInt => Value::SmallInt(buf.get_i16_le()),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Double => Value::Double(buf.get_f64_le()),
            DataType::Char(n) => {
                let n = *n as usize;
                let len = buf.get_u16_le() as usize;
                if len > n {
                    return Err(DbError::InvalidPageData(format!(
                        "string length {} exceeds CHAR({})",
                        len, n
                    )));
                }
                let s = std::str::from_utf8(&buf[..len])
                    .map_err(|e| DbError::InvalidPageData(e.to_string()))?
                    .to_string();
                buf.advance(n);
                Value::String(s)
            }
        };
        Ok(value)
    }

    /// Compares two values for ordering.
    /// Returns None if the values are not comparable (different types or null).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) | (_, Value::Null) => None,

            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),

            (Value::Double(a), b) => b.as_i64().and_then(|b| a.partial_cmp(&(b as f64))),
            (a, Value::Double(b)) => a.as_i64().and_then(|a| (a as f64).partial_cmp(b)),

            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::SmallInt(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding() {
        let mut buf = BytesMut::new();
        Value::Integer(42)
            .serialize(&DataType::Integer, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[42, 0, 0, 0]);

        let mut slice = &buf[..];
        let recovered = Value::deserialize(&mut slice, &DataType::Integer).unwrap();
        assert_eq!(recovered, Value::Integer(42));
        assert!(slice.is_empty());
    }

    #[test]
    fn test_char_is_fixed_width() {
        let mut buf = BytesMut::new();
        Value::from("hi")
            .serialize(&DataType::Char(5), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[2, 0, b'h', b'i', 0, 0, 0]);

        let mut slice = &buf[..];
        let recovered = Value::deserialize(&mut slice, &DataType::Char(5)).unwrap();
        assert_eq!(recovered, Value::from("hi"));
    }

    #[test]
    fn test_string_too_long() {
        let mut buf = BytesMut::new();
        let err = Value::from("too long")
            .serialize(&DataType::Char(3), &mut buf)
            .unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let mut buf = BytesMut::new();
        assert!(Value::from("x")
            .serialize(&DataType::Integer, &mut buf)
            .is_err());
        assert!(Value::BigInt(1)
            .serialize(&DataType::SmallInt, &mut buf)
            .is_err());
    }

    #[test]
    fn test_short_buffer() {
        let mut slice: &[u8] = &[1, 2];
        assert!(Value::deserialize(&mut slice, &DataType::Integer).is_err());
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            Value::Integer(10).compare(&Value::Integer(20)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Integer(10).compare(&Value::BigInt(5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Double(1.5).compare(&Value::Integer(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("abc").compare(&Value::from("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(Value::from("abc").compare(&Value::Integer(1)), None);
    }
}
