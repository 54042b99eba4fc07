use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TableId, TransactionId};
use crate::storage::HeapFileIter;
use crate::tuple::{Schema, Tuple};

use super::Operator;

/// Scans every record of a table, in page then slot order.
///
/// Column names are reported as `alias.column`. Emitted tuples keep their
/// record ids so they can be fed to [`Delete`](super::Delete).
pub struct SeqScan {
    bp: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    alias: String,
    schema: Arc<Schema>,
    iter: Option<HeapFileIter>,
}

impl SeqScan {
    pub fn new(
        bp: Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        alias: impl Into<String>,
    ) -> Result<Self> {
        let alias = alias.into();
        let schema = Arc::new(bp.catalog().schema(table_id)?.with_alias(&alias));
        Ok(Self {
            bp,
            tid,
            table_id,
            alias,
            schema,
            iter: None,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> Result<()> {
        let file = self.bp.catalog().file(self.table_id)?;
        self.iter = Some(file.iter(&self.bp, self.tid));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let iter = self.iter.as_mut().ok_or(DbError::OperatorNotOpen)?;
        match iter.next() {
            Some(tuple) => Ok(Some(tuple?.with_schema(Arc::clone(&self.schema)))),
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.iter
            .as_mut()
            .ok_or(DbError::OperatorNotOpen)?
            .rewind();
        Ok(())
    }

    fn close(&mut self) {
        self.iter = None;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
