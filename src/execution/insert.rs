use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TableId, TransactionId};
use crate::tuple::{DataType, Schema, Tuple, TupleBuilder};

use super::Operator;

/// Single `count` column shared by Insert and Delete
pub(crate) fn count_schema() -> Arc<Schema> {
    Schema::builder().column("count", DataType::Integer).build_arc()
}

/// Column types match position by position; names may differ.
pub(crate) fn same_layout(a: &Schema, b: &Schema) -> bool {
    a.column_count() == b.column_count()
        && a.columns()
            .zip(b.columns())
            .all(|(x, y)| x.data_type() == y.data_type())
}

/// Inserts every tuple of its child into a table, then emits one record
/// holding the number of tuples inserted.
pub struct Insert {
    bp: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    table_id: TableId,
    table_schema: Arc<Schema>,
    schema: Arc<Schema>,
    count: Option<i32>,
    emitted: bool,
}

impl Insert {
    pub fn new(
        bp: Arc<BufferPool>,
        tid: TransactionId,
        child: Box<dyn Operator>,
        table_id: TableId,
    ) -> Result<Self> {
        let table_schema = bp.catalog().schema(table_id)?;
        if !same_layout(child.schema(), &table_schema) {
            return Err(DbError::SchemaMismatch);
        }
        Ok(Self {
            bp,
            tid,
            child,
            table_id,
            table_schema,
            schema: count_schema(),
            count: None,
            emitted: false,
        })
    }
}

impl Operator for Insert {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if self.emitted {
            return Ok(None);
        }

        let count = match self.count {
            Some(count) => count,
            None => {
                let mut count = 0;
                while let Some(tuple) = self.child.next()? {
                    let tuple = tuple.with_schema(Arc::clone(&self.table_schema));
                    self.bp.insert_tuple(self.tid, self.table_id, tuple)?;
                    count += 1;
                }
                self.count = Some(count);
                count
            }
        };

        self.emitted = true;
        Ok(Some(TupleBuilder::new(Arc::clone(&self.schema)).value(count).build()))
    }

    /// Re-emits the count; the child is not consumed again.
    fn rewind(&mut self) -> Result<()> {
        self.emitted = false;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
