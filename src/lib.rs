//! heapdb - a page-oriented heap storage engine with a locking buffer pool
//!
//! Tables are flat files of fixed-size heap pages. Every page access goes
//! through one buffer pool, which takes a page-level shared or exclusive
//! lock for the requesting transaction before serving the page from memory
//! or disk. Transactions commit by forcing their dirty pages to disk and
//! abort by re-reading them; dirty pages are never evicted.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): on-disk format and file I/O
//!   - `HeapPage`: header bitmap plus fixed-size record slots
//!   - `HeapFile`: one table's append-only page file
//!   - `DiskManager` / `DiskScheduler`: page reads and writes on a worker thread
//!
//! - **Concurrency** (`concurrency`): page locks and transaction handles
//!   - `LockManager`: shared/exclusive locks with in-place upgrade
//!   - `Transaction`: commit or abort exactly once
//!
//! - **Buffer Pool** (`buffer`): the page cache
//!   - `BufferPool`: lock, then cache hit or disk load, NO-STEAL eviction
//!   - `LruKReplacer`: ranks clean pages for eviction
//!   - `PageHandle`: read access always, write access only under `ReadWrite`
//!
//! - **Records** (`tuple`): fixed-width typed records and schemas
//!
//! - **Catalog** (`catalog`): tables by id and name, schema file loading
//!
//! - **Execution** (`execution`): scan, filter, insert, delete and aggregate operators
//!
//! # Example
//!
//! ```rust,no_run
//! use heapdb::execution::{collect, SeqScan};
//! use heapdb::{Config, Database, TupleBuilder};
//!
//! // schema.txt: "users (id int pk, name string)"
//! let db = Database::open(Config::default(), "schema.txt").unwrap();
//! let users = db.catalog().table_id("users").unwrap();
//! let schema = db.catalog().schema(users).unwrap();
//!
//! let txn = db.begin();
//! let row = TupleBuilder::new(schema).value(1i32).value("alice").build();
//! db.buffer_pool().insert_tuple(txn.id(), users, row).unwrap();
//! txn.commit().unwrap();
//!
//! let txn = db.begin();
//! let mut scan = SeqScan::new(db.buffer_pool().clone(), txn.id(), users, "u").unwrap();
//! for row in collect(&mut scan).unwrap() {
//!     println!("{}", row);
//! }
//! txn.commit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod storage;
pub mod tuple;

mod database;

pub use common::{
    Config, DbError, PageId, Permissions, RecordId, Result, SlotId, TableId, TransactionId,
};
pub use database::Database;
pub use tuple::{DataType, Schema, Tuple, TupleBuilder, Value};
