use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};
use crate::tuple::{Schema, Tuple, TupleBuilder};

use super::insert::count_schema;
use super::Operator;

/// Deletes every tuple its child produces (located by record id), then
/// emits one record holding the number of tuples deleted.
pub struct Delete {
    bp: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    schema: Arc<Schema>,
    count: Option<i32>,
    emitted: bool,
}

impl Delete {
    pub fn new(bp: Arc<BufferPool>, tid: TransactionId, child: Box<dyn Operator>) -> Self {
        Self {
            bp,
            tid,
            child,
            schema: count_schema(),
            count: None,
            emitted: false,
        }
    }
}

impl Operator for Delete {
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
                // Drain the child first so a scan never observes its own deletes
                let mut victims = Vec::new();
                while let Some(tuple) = self.child.next()? {
                    victims.push(tuple);
                }
                for tuple in &victims {
                    self.bp.delete_tuple(self.tid, tuple)?;
                }
                let count = victims.len() as i32;
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
