use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{DbError, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::Schema;

/// A registered table
struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: String,
}

#[derive(Default)]
struct CatalogInner {
    tables: HashMap<TableId, TableEntry>,
    names: HashMap<String, TableId>,
}

/// Registry of the tables the buffer pool can reach, by id and by name.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` as table `name`. An existing table with the same
    /// name or id is replaced.
    ///
    /// Re-registering a file keeps its table id, and a buffer pool that
    /// already cached its pages keeps them decoded with the old schema. A
    /// table whose schema changed must be read through a fresh
    /// [`BufferPool`](crate::buffer::BufferPool), as
    /// [`Database::open`](crate::Database::open) does.
    pub fn add_table(
        &self,
        file: Arc<HeapFile>,
        name: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> TableId {
        let name = name.into();
        let table_id = file.table_id();
        let mut inner = self.inner.write();

        if let Some(old_id) = inner.names.remove(&name) {
            inner.tables.remove(&old_id);
        }
        if let Some(old) = inner.tables.remove(&table_id) {
            inner.names.remove(&old.name);
        }

        inner.names.insert(name.clone(), table_id);
        inner.tables.insert(
            table_id,
            TableEntry {
                file,
                name,
                primary_key: primary_key.into(),
            },
        );
        table_id
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.inner
            .read()
            .names
            .get(name)
            .copied()
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    /// The backing file of a table.
    pub fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(DbError::TableNotFound(table_id))
    }

    pub fn schema(&self, table_id: TableId) -> Result<Arc<Schema>> {
        Ok(Arc::clone(self.file(table_id)?.schema()))
    }

    /// Primary key column name; empty when none was declared.
    pub fn primary_key(&self, table_id: TableId) -> Result<String> {
        self.with_entry(table_id, |entry| entry.primary_key.clone())
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.with_entry(table_id, |entry| entry.name.clone())
    }

    fn with_entry<T>(&self, table_id: TableId, f: impl FnOnce(&TableEntry) -> T) -> Result<T> {
        self.inner
            .read()
            .tables
            .get(&table_id)
            .map(f)
            .ok_or(DbError::TableNotFound(table_id))
    }

    /// Ids of every registered table, sorted by table name.
    pub fn table_ids(&self) -> Vec<TableId> {
        let inner = self.inner.read();
        let mut names: Vec<(&String, &TableId)> = inner.names.iter().collect();
        names.sort();
        names.into_iter().map(|(_, id)| *id).collect()
    }

    /// Forgets every table. Files are left on disk.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.tables.clear();
        inner.names.clear();
    }
}
