use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Schema, Tuple};

use super::{Operator, Predicate};

/// Passes through the child's tuples that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn Operator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Self {
        Self { predicate, child }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl Operator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.child.schema()
    }
}
