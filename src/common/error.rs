use thiserror::Error;

use super::types::{PageId, RecordId, TableId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("Transaction {tid} aborted: {reason}")]
    TransactionAborted { tid: TransactionId, reason: String },

    #[error("Every cached page is dirty, nothing can be evicted")]
    AllPagesDirty,

    #[error("Page {page_id} is out of range (table file has {num_pages} pages)")]
    PageOutOfRange { page_id: PageId, num_pages: u32 },

    #[error("Invalid page data: {0}")]
    InvalidPageData(String),

    #[error("Record schema does not match the page schema")]
    SchemaMismatch,

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Page {0} is full")]
    PageFull(PageId),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record {record_id} does not belong to {table_id}")]
    TableMismatch {
        record_id: RecordId,
        table_id: TableId,
    },

    #[error("Page {0} was fetched read-only")]
    ReadOnlyPage(PageId),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table '{0}' not found")]
    TableNameNotFound(String),

    #[error("Invalid schema file at line {line}: {reason}")]
    InvalidSchemaFile { line: usize, reason: String },

    #[error("Unsupported aggregate: {0}")]
    UnsupportedAggregate(String),

    #[error("Operator is not open")]
    OperatorNotOpen,
}

impl DbError {
    pub(crate) fn aborted(tid: TransactionId, reason: impl Into<String>) -> Self {
        DbError::TransactionAborted {
            tid,
            reason: reason.into(),
        }
    }

    /// True when the caller must run the abort path for its transaction.
    pub fn is_abort(&self) -> bool {
        matches!(self, DbError::TransactionAborted { .. })
    }

    /// True when the buffer pool could not make room; retrying after
    /// other transactions finish may succeed.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, DbError::AllPagesDirty)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let tid = TransactionId::next();
        assert!(DbError::aborted(tid, "lock timeout").is_abort());
        assert!(DbError::AllPagesDirty.is_resource_exhausted());
        assert!(!DbError::SchemaMismatch.is_abort());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DbError = io_err.into();
        assert!(matches!(err, DbError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: missing");
    }
}
