use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;

use crate::common::{DbError, RecordId, Result};

use super::{Schema, Value};

/// Represents a single row in a table.
///
/// ## Record Binary Format
///
/// Every record of a schema encodes to exactly `schema.tuple_size()` bytes:
///
/// ```text
/// +----------------+-------------------------------------------+
/// | Null Bitmap    | Column values, schema order, fixed widths |
/// | (N bytes)      | (sum of DataType::fixed_size)             |
/// +----------------+-------------------------------------------+
/// ```
///
/// - **Null Bitmap**: ceil(column_count / 8) bytes, bit `i % 8` of byte `i / 8`
///   set when column `i` is NULL
/// - **Values**: NULL columns are written as zeros so offsets stay fixed
///
/// A tuple read from (or inserted into) a heap page carries the
/// [`RecordId`] of its slot.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple with the given schema and values. The value count
    /// is checked when the tuple is encoded.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        Self {
            schema,
            values,
            record_id: None,
        }
    }

    /// Decodes a tuple from exactly `schema.tuple_size()` bytes.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        if data.len() != schema.tuple_size() {
            return Err(DbError::InvalidPageData(format!(
                "record needs {} bytes, got {}",
                schema.tuple_size(),
                data.len()
            )));
        }

        let bitmap_size = schema.null_bitmap_size();
        let (null_bitmap, mut rest) = data.split_at(bitmap_size);

        let mut values = Vec::with_capacity(schema.column_count());
        for (i, col) in schema.columns().enumerate() {
            let value = Value::deserialize(&mut rest, col.data_type())?;
            if null_bitmap[i / 8] & (1 << (i % 8)) != 0 {
                values.push(Value::Null);
            } else {
                values.push(value);
            }
        }

        Ok(Self::new(schema, values))
    }

    /// Encodes the tuple to exactly `schema.tuple_size()` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.values.len() != self.schema.column_count() {
            return Err(DbError::SchemaMismatch);
        }

        let mut buf = BytesMut::with_capacity(self.schema.tuple_size());
        buf.extend_from_slice(&self.null_bitmap()?);

        for (value, col) in self.values.iter().zip(self.schema.columns()) {
            value.serialize(col.data_type(), &mut buf)?;
        }

        debug_assert_eq!(buf.len(), self.schema.tuple_size());
        Ok(buf.to_vec())
    }

    fn null_bitmap(&self) -> Result<Vec<u8>> {
        let mut bitmap = vec![0u8; self.schema.null_bitmap_size()];
        for (i, (value, col)) in self.values.iter().zip(self.schema.columns()).enumerate() {
            if value.is_null() {
                if !col.is_nullable() {
                    return Err(DbError::TypeMismatch(format!(
                        "column '{}' is not nullable",
                        col.name()
                    )));
                }
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        Ok(bitmap)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value for the given column name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Sets the value at the given column index.
    pub fn set_value(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Where this record lives, if it has been stored.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Returns the same values under another schema with the same layout
    /// (used to re-label columns).
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = schema;
        self
    }
}

/// Equality is on content: the record id is not compared.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vals: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", vals.join("\t"))
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
    current_index: usize,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let count = schema.column_count();
        Self {
            schema,
            values: vec![Value::Null; count],
            current_index: 0,
        }
    }

    /// Sets the value at the current position and advances.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        if let Some(slot) = self.values.get_mut(self.current_index) {
            *slot = value.into();
            self.current_index += 1;
        }
        self
    }

    /// Leaves the current position NULL and advances.
    pub fn null(mut self) -> Self {
        if self.current_index < self.values.len() {
            self.current_index += 1;
        }
        self
    }

    /// Sets the value for a specific column by name.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some(index) = self.schema.column_index(name) {
            self.values[index] = value.into();
        }
        self
    }

    pub fn build(self) -> Tuple {
        Tuple::new(self.schema, self.values)
    }
}
