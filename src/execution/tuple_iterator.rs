use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Schema, Tuple};

use super::Operator;

/// Operator over an in-memory list of tuples.
pub struct TupleIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    position: Option<usize>,
}

impl TupleIterator {
    pub fn new(schema: Arc<Schema>, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            position: None,
        }
    }
}

impl Operator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.position = Some(0);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let pos = self.position.as_mut().ok_or(DbError::OperatorNotOpen)?;
        let tuple = self.tuples.get(*pos).cloned();
        if tuple.is_some() {
            *pos += 1;
        }
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.open()
    }

    fn close(&mut self) {
        self.position = None;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
