use std::fmt;

use crate::common::DEFAULT_STRING_LEN;

/// Column types. Every type has a fixed on-page width so that a table's
/// records all occupy the same number of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 1 byte (0 = false, 1 = true)
    Boolean,

    /// 16-bit signed integer: 2 bytes, little-endian
    SmallInt,

    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// 64-bit signed integer: 8 bytes, little-endian
    BigInt,

    /// 64-bit floating point: 8 bytes, IEEE 754
    Double,

    /// Bounded string: 2-byte length followed by exactly n bytes, zero padded
    Char(u16),
}

impl DataType {
    /// Returns the encoded width in bytes.
    pub fn fixed_size(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::SmallInt => 2,
            DataType::Integer => 4,
            DataType::BigInt => 8,
            DataType::Double => 8,
            DataType::Char(n) => 2 + *n as usize,
        }
    }

    /// True for the integer family (aggregatable with every operator).
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::SmallInt | DataType::Integer | DataType::BigInt)
    }

    /// Parses a type name as written in a schema file.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(DataType::Integer),
            "string" => Some(DataType::Char(DEFAULT_STRING_LEN)),
            "bool" | "boolean" => Some(DataType::Boolean),
            "smallint" => Some(DataType::SmallInt),
            "bigint" => Some(DataType::BigInt),
            "double" => Some(DataType::Double),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Integer => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_calculations() {
        assert_eq!(DataType::Boolean.fixed_size(), 1);
        assert_eq!(DataType::Integer.fixed_size(), 4);
        assert_eq!(DataType::BigInt.fixed_size(), 8);
        assert_eq!(DataType::Char(20).fixed_size(), 22);
    }

    #[test]
    fn test_parse_schema_names() {
        assert_eq!(DataType::parse("int"), Some(DataType::Integer));
        assert_eq!(DataType::parse(" INT "), Some(DataType::Integer));
        assert_eq!(DataType::parse("string"), Some(DataType::Char(128)));
        assert_eq!(DataType::parse("blob"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Integer.to_string(), "INT");
        assert_eq!(DataType::Char(10).to_string(), "CHAR(10)");
    }
}
