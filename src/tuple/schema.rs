use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::DataType;

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column data type.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns whether the column allows NULL values.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns a copy of this column under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.data_type)
    }
}

/// The layout of a table's records. Every record of a schema encodes to
/// exactly [`Schema::tuple_size`] bytes.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,

    /// Map from column name to column index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Size of the null bitmap in bytes (ceiling of column_count / 8)
    null_bitmap_size: usize,

    /// Encoded record width: null bitmap plus every column's fixed width
    tuple_size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut name_to_index = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            name_to_index.entry(col.name.clone()).or_insert(i);
        }

        let null_bitmap_size = columns.len().div_ceil(8);
        let tuple_size =
            null_bitmap_size + columns.iter().map(|c| c.data_type.fixed_size()).sum::<usize>();

        Self {
            columns,
            name_to_index,
            null_bitmap_size,
            tuple_size,
        }
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Concatenates two schemas, left columns first.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let columns = left.columns.iter().chain(&right.columns).cloned().collect();
        Schema::new(columns)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the index of the first column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn null_bitmap_size(&self) -> usize {
        self.null_bitmap_size
    }

    /// Encoded size of one record in bytes.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Returns a copy with every column name prefixed by `alias.`.
    pub fn with_alias(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|c| c.renamed(format!("{}.{}", alias, c.name)))
            .collect();
        Schema::new(columns)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", cols.join(", "))
    }
}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a non-nullable column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type, false));
        self
    }

    /// Adds a nullable column.
    pub fn nullable_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type, true));
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> Schema {
        Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Char(16))
            .nullable_column("age", DataType::SmallInt)
            .build()
    }

    #[test]
    fn test_schema_creation() {
        let schema = create_test_schema();
        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column(0).unwrap().name(), "id");
        assert_eq!(schema.column_index("age"), Some(2));
        assert_eq!(schema.column_index("missing"), None);
        assert!(schema.column(2).unwrap().is_nullable());
    }

    #[test]
    fn test_tuple_size() {
        let schema = create_test_schema();
        // bitmap (1) + id (4) + name (2 + 16) + age (2)
        assert_eq!(schema.tuple_size(), 25);
    }

    #[test]
    fn test_equality_ignores_arc_identity() {
        let a = Arc::new(create_test_schema());
        let b = Arc::new(create_test_schema());
        assert_eq!(a, b);

        let other = Schema::builder().column("id", DataType::BigInt).build();
        assert_ne!(*a, other);
    }

    #[test]
    fn test_merge_and_alias() {
        let left = Schema::builder().column("a", DataType::Integer).build();
        let right = Schema::builder().column("b", DataType::Boolean).build();
        let merged = Schema::merge(&left, &right);
        assert_eq!(merged.column_count(), 2);
        assert_eq!(merged.tuple_size(), 1 + 4 + 1);

        let aliased = merged.with_alias("t");
        assert_eq!(aliased.column(1).unwrap().name(), "t.b");
        assert_eq!(aliased.to_string(), "t.a(INT), t.b(BOOLEAN)");
    }
}
