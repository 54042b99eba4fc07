use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Schema, Tuple};

/// Pull-based relational operator.
///
/// `open` must be called before `next`; `next` returns `Ok(None)` once the
/// operator is exhausted. `rewind` restarts an open operator from its first
/// tuple. `schema` is available before `open`.
pub trait Operator: Send {
    fn open(&mut self) -> Result<()>;

    fn next(&mut self) -> Result<Option<Tuple>>;

    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    fn schema(&self) -> &Arc<Schema>;
}

/// Opens `op`, pulls every tuple and closes it again.
pub fn collect(op: &mut dyn Operator) -> Result<Vec<Tuple>> {
    op.open()?;
    let mut tuples = Vec::new();
    while let Some(tuple) = op.next()? {
        tuples.push(tuple);
    }
    op.close();
    Ok(tuples)
}
