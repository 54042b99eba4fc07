//! Integration tests for the buffer pool: eviction, commit and abort

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use heapdb::buffer::BufferPool;
use heapdb::catalog::Catalog;
use heapdb::storage::HeapFile;
use heapdb::{
    Config, DataType, DbError, PageId, Permissions, Schema, TableId, TransactionId, TupleBuilder,
    Value,
};
use tempfile::TempDir;

const PAGE: usize = 52;

fn config(capacity: usize) -> Config {
    Config::default()
        .with_page_size(PAGE)
        .with_buffer_pool_pages(capacity)
        .with_lock_timeout(Duration::from_millis(50), Duration::from_millis(100))
        .with_lock_wait(Duration::from_millis(1))
}

fn create_pool(capacity: usize) -> (Arc<BufferPool>, Arc<HeapFile>, TempDir) {
    let dir = TempDir::new().unwrap();
    let schema = Schema::builder().column("v", DataType::Integer).build_arc();
    let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), schema, PAGE).unwrap());

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(Arc::clone(&file), "t", "");
    (Arc::new(BufferPool::new(config(capacity), catalog)), file, dir)
}

fn insert(bp: &BufferPool, table_id: TableId, tid: TransactionId, v: i32) -> heapdb::Result<()> {
    let schema = bp.catalog().schema(table_id)?;
    bp.insert_tuple(tid, table_id, TupleBuilder::new(schema).value(v).build())
}

fn count_rows(bp: &Arc<BufferPool>, file: &Arc<HeapFile>) -> usize {
    let tid = TransactionId::next();
    let n = file.iter(bp, tid).map(|t| t.unwrap()).count();
    bp.transaction_complete(tid, true).unwrap();
    n
}

#[test]
fn test_clean_page_evicted_and_reloaded() {
    let (bp, file, _dir) = create_pool(1);
    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);
    let p1 = PageId::new(table_id, 1);

    let t1 = TransactionId::next();
    for v in 0..10 {
        insert(&bp, table_id, t1, v).unwrap();
    }
    bp.transaction_complete(t1, true).unwrap();

    // P0 is full and clean, so the insert may evict it to load P1
    let t2 = TransactionId::next();
    insert(&bp, table_id, t2, 10).unwrap();
    assert!(bp.is_cached(p1));
    assert!(!bp.is_cached(p0));
    assert_eq!(bp.cached_pages(), 1);
    bp.transaction_complete(t2, true).unwrap();

    let reads_before = file.disk_reads();
    let t3 = TransactionId::next();
    bp.get_page(t3, p0, Permissions::ReadOnly).unwrap();
    assert_eq!(file.disk_reads(), reads_before + 1);
    assert!(bp.is_cached(p0));
    assert!(!bp.is_cached(p1));

    // A hit costs no I/O
    bp.get_page(t3, p0, Permissions::ReadOnly).unwrap();
    assert_eq!(file.disk_reads(), reads_before + 1);
    bp.transaction_complete(t3, true).unwrap();
}

#[test]
fn test_all_pages_dirty() {
    let (bp, file, _dir) = create_pool(1);
    let table_id = file.table_id();

    let t1 = TransactionId::next();
    for v in 0..10 {
        insert(&bp, table_id, t1, v).unwrap();
    }

    // P0 is full and dirty; P1 has nowhere to go
    let err = insert(&bp, table_id, t1, 10).unwrap_err();
    assert!(matches!(err, DbError::AllPagesDirty));
    assert!(err.is_resource_exhausted());

    bp.transaction_complete(t1, false).unwrap();
}

#[test]
fn test_commit_forces_pages_to_disk() {
    let (bp, file, _dir) = create_pool(4);
    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);

    let t1 = TransactionId::next();
    for v in 0..3 {
        insert(&bp, table_id, t1, v).unwrap();
    }
    let writes_before = file.disk_writes();
    bp.transaction_complete(t1, true).unwrap();
    assert_eq!(file.disk_writes(), writes_before + 1);
    assert!(!bp.holds_lock(t1, p0));

    let on_disk = file.read_page(p0).unwrap();
    let t2 = TransactionId::next();
    let handle = bp.get_page(t2, p0, Permissions::ReadOnly).unwrap();
    let cached = handle.read();
    assert_eq!(cached.is_dirty(), None);
    assert_eq!(cached.to_bytes().unwrap(), on_disk.to_bytes().unwrap());
    assert_eq!(
        cached.before_image().unwrap().to_bytes().unwrap(),
        on_disk.to_bytes().unwrap()
    );
}

#[test]
fn test_abort_restores_disk_contents() {
    let (bp, file, _dir) = create_pool(4);
    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);

    let t1 = TransactionId::next();
    insert(&bp, table_id, t1, 1).unwrap();
    bp.transaction_complete(t1, true).unwrap();

    let writes_before = file.disk_writes();
    let t2 = TransactionId::next();
    insert(&bp, table_id, t2, 2).unwrap();
    insert(&bp, table_id, t2, 3).unwrap();
    bp.transaction_complete(t2, false).unwrap();

    assert_eq!(file.disk_writes(), writes_before);
    assert!(bp.lock_manager().locked_pages(t2).is_empty());
    assert_eq!(count_rows(&bp, &file), 1);

    let t3 = TransactionId::next();
    let handle = bp.get_page(t3, p0, Permissions::ReadOnly).unwrap();
    assert_eq!(handle.read().is_dirty(), None);
    assert_eq!(handle.read().num_empty_slots(), 9);
}

#[test]
fn test_read_only_handle_cannot_write() {
    let (bp, file, _dir) = create_pool(4);
    let table_id = file.table_id();

    let t1 = TransactionId::next();
    insert(&bp, table_id, t1, 1).unwrap();
    bp.transaction_complete(t1, true).unwrap();

    let t2 = TransactionId::next();
    let handle = bp
        .get_page(t2, PageId::new(table_id, 0), Permissions::ReadOnly)
        .unwrap();
    assert!(matches!(handle.write().err(), Some(DbError::ReadOnlyPage(_))));
    bp.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_missing_page_is_out_of_range() {
    let (bp, file, _dir) = create_pool(4);
    let tid = TransactionId::next();

    let missing = PageId::new(file.table_id(), 3);
    let err = bp.get_page(tid, missing, Permissions::ReadOnly).unwrap_err();
    assert!(matches!(err, DbError::PageOutOfRange { .. }));
    assert!(!bp.holds_lock(tid, missing));
    assert!(!bp.is_cached(missing));
    bp.transaction_complete(tid, false).unwrap();
}

#[test]
fn test_flush_all_pages_writes_uncommitted_changes() {
    let (bp, file, _dir) = create_pool(4);
    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);

    let t1 = TransactionId::next();
    insert(&bp, table_id, t1, 42).unwrap();
    assert_eq!(file.read_page(p0).unwrap().tuples().count(), 0);

    bp.flush_all_pages().unwrap();

    let on_disk = file.read_page(p0).unwrap();
    let rows: Vec<_> = on_disk.tuples().map(|t| t.value(0).cloned().unwrap()).collect();
    assert_eq!(rows, vec![Value::Integer(42)]);

    let handle = bp.get_page(t1, p0, Permissions::ReadOnly).unwrap();
    let cached = handle.read();
    assert_eq!(cached.is_dirty(), None);
    assert_eq!(
        cached.before_image().unwrap().to_bytes().unwrap(),
        on_disk.to_bytes().unwrap()
    );
    drop(cached);
    bp.transaction_complete(t1, true).unwrap();
}

#[test]
fn test_flush_pages_only_touches_one_transaction() {
    let (bp, file, dir) = create_pool(4);
    let schema = Schema::builder().column("v", DataType::Integer).build_arc();
    let other = Arc::new(HeapFile::open(dir.path().join("u.dat"), schema, PAGE).unwrap());
    bp.catalog().add_table(Arc::clone(&other), "u", "");

    let a0 = PageId::new(file.table_id(), 0);
    let b0 = PageId::new(other.table_id(), 0);

    let t1 = TransactionId::next();
    let t2 = TransactionId::next();
    insert(&bp, file.table_id(), t1, 1).unwrap();
    insert(&bp, other.table_id(), t2, 2).unwrap();

    let other_writes = other.disk_writes();
    bp.flush_pages(t1).unwrap();

    assert_eq!(file.read_page(a0).unwrap().tuples().count(), 1);
    assert_eq!(other.read_page(b0).unwrap().tuples().count(), 0);
    assert_eq!(other.disk_writes(), other_writes);

    assert_eq!(bp.get_page(t1, a0, Permissions::ReadOnly).unwrap().read().is_dirty(), None);
    assert_eq!(
        bp.get_page(t2, b0, Permissions::ReadOnly).unwrap().read().is_dirty(),
        Some(t2)
    );

    bp.transaction_complete(t1, true).unwrap();
    bp.transaction_complete(t2, false).unwrap();
}

#[test]
fn test_flush_page() {
    let (bp, file, _dir) = create_pool(4);
    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);

    // Not cached: nothing to write
    let writes = file.disk_writes();
    bp.flush_page(PageId::new(table_id, 5)).unwrap();
    assert_eq!(file.disk_writes(), writes);

    let t1 = TransactionId::next();
    insert(&bp, table_id, t1, 3).unwrap();
    let writes = file.disk_writes();
    bp.flush_page(p0).unwrap();
    assert_eq!(file.disk_writes(), writes + 1);
    assert_eq!(file.read_page(p0).unwrap().tuples().count(), 1);

    // Already clean: no second write
    bp.flush_page(p0).unwrap();
    assert_eq!(file.disk_writes(), writes + 1);
    bp.transaction_complete(t1, true).unwrap();
}

#[test]
fn test_writer_blocks_reader_until_commit() {
    let dir = TempDir::new().unwrap();
    let schema = Schema::builder().column("v", DataType::Integer).build_arc();
    let file = Arc::new(HeapFile::open(dir.path().join("t.dat"), schema, PAGE).unwrap());
    let catalog = Arc::new(Catalog::new());
    catalog.add_table(Arc::clone(&file), "t", "");
    let config = config(4).with_lock_timeout(Duration::from_secs(5), Duration::from_secs(6));
    let bp = Arc::new(BufferPool::new(config, catalog));

    let table_id = file.table_id();
    let p0 = PageId::new(table_id, 0);
    let writer = TransactionId::next();
    insert(&bp, table_id, writer, 7).unwrap();

    let reader = {
        let bp = Arc::clone(&bp);
        thread::spawn(move || {
            let tid = TransactionId::next();
            let handle = bp.get_page(tid, p0, Permissions::ReadOnly).unwrap();
            let rows = handle.read().tuples().count();
            drop(handle);
            bp.transaction_complete(tid, true).unwrap();
            rows
        })
    };

    thread::sleep(Duration::from_millis(50));
    bp.transaction_complete(writer, true).unwrap();
    assert_eq!(reader.join().unwrap(), 1);
}
