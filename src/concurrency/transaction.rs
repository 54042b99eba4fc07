use std::sync::Arc;

use log::warn;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};

/// An active transaction.
///
/// Ending it consumes the handle, so a finished transaction cannot be
/// reused. A handle dropped without `commit` or `abort` is aborted.
pub struct Transaction {
    tid: TransactionId,
    buffer_pool: Arc<BufferPool>,
    active: bool,
}

impl Transaction {
    /// Starts a transaction with a fresh id.
    pub fn begin(buffer_pool: Arc<BufferPool>) -> Self {
        Self {
            tid: TransactionId::next(),
            buffer_pool,
            active: true,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.tid
    }

    /// Writes every page this transaction dirtied, then releases its locks.
    pub fn commit(mut self) -> Result<()> {
        self.active = false;
        self.buffer_pool.transaction_complete(self.tid, true)
    }

    /// Restores every page this transaction dirtied, then releases its locks.
    pub fn abort(mut self) -> Result<()> {
        self.active = false;
        self.buffer_pool.transaction_complete(self.tid, false)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.active {
            warn!("{} dropped while active, aborting", self.tid);
            if let Err(e) = self.buffer_pool.transaction_complete(self.tid, false) {
                warn!("abort of {} failed: {}", self.tid, e);
            }
        }
    }
}
