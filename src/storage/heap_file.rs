use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::buffer::{BufferPool, PageHandle};
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::tuple::{Schema, Tuple};

use super::disk::{DiskManager, DiskScheduler};
use super::page::HeapPage;

/// The backing file of one table: an append-only run of [`HeapPage`]s.
///
/// Page-level reads and writes go straight to disk through the file's
/// [`DiskScheduler`]. Record-level operations take their pages from the
/// [`BufferPool`] so that locking and caching apply.
pub struct HeapFile {
    table_id: TableId,
    schema: Arc<Schema>,
    path: PathBuf,
    scheduler: DiskScheduler,
}

impl HeapFile {
    /// Opens (creating if missing) the table file at `path`. The table id
    /// is the CRC32 of the file's absolute path.
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>, page_size: usize) -> Result<Self> {
        let disk_manager = Arc::new(DiskManager::new(path.as_ref(), page_size)?);
        let path = std::fs::canonicalize(path.as_ref())?;
        let table_id = TableId::new(crc32fast::hash(path.to_string_lossy().as_bytes()));

        // Reject schemas whose records cannot fit a page before any I/O happens
        HeapPage::new_empty(PageId::new(table_id, 0), schema.clone(), page_size)?;

        debug!(
            "opened {} at {} ({} pages)",
            table_id,
            path.display(),
            disk_manager.num_pages()
        );

        Ok(Self {
            table_id,
            schema,
            path,
            scheduler: DiskScheduler::new(disk_manager),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> usize {
        self.scheduler.disk_manager().page_size()
    }

    /// floor(file length / page size)
    pub fn num_pages(&self) -> u32 {
        self.scheduler.disk_manager().num_pages()
    }

    /// Pages read from disk since open.
    pub fn disk_reads(&self) -> u32 {
        self.scheduler.disk_manager().num_reads()
    }

    /// Pages written to disk since open.
    pub fn disk_writes(&self) -> u32 {
        self.scheduler.disk_manager().num_writes()
    }

    fn check_table(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(DbError::PageOutOfRange {
                page_id,
                num_pages: self.num_pages(),
            });
        }
        Ok(())
    }

    /// Reads and decodes one page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_table(page_id)?;
        let data = self.scheduler.schedule_read_sync(page_id)?;
        HeapPage::from_bytes(page_id, self.schema.clone(), &data)
    }

    /// Writes one page to disk. The page number may be at most `num_pages()`.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        self.check_table(page.page_id())?;
        let data = page.to_bytes()?;
        self.scheduler.schedule_write_sync(page.page_id(), data)
    }

    /// Stores `tuple` in the first page with a free slot, appending a page
    /// when every existing one is full. Returns the modified page.
    ///
    /// A page found full is unlocked again unless `tid` already held a lock
    /// on it before probing.
    pub fn insert_tuple(
        &self,
        bp: &BufferPool,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<PageHandle>> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch);
        }

        for page_no in 0..self.num_pages() {
            let page_id = PageId::new(self.table_id, page_no);
            let held_before = bp.holds_lock(tid, page_id);

            let handle = bp.get_page(tid, page_id, Permissions::ReadWrite)?;
            let has_room = handle.read().num_empty_slots() > 0;
            if has_room {
                handle.write()?.insert_tuple(tuple)?;
                return Ok(vec![handle]);
            }

            drop(handle);
            if !held_before {
                bp.release_page(tid, page_id);
            }
        }

        let page_no = self.scheduler.schedule_append_sync()?;
        let page_id = PageId::new(self.table_id, page_no);
        debug!("{} appended {}", tid, page_id);

        let handle = bp.get_page(tid, page_id, Permissions::ReadWrite)?;
        handle.write()?.insert_tuple(tuple)?;
        Ok(vec![handle])
    }

    /// Frees the slot named by `tuple`'s record id. Returns the modified page.
    pub fn delete_tuple(
        &self,
        bp: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageHandle>> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::RecordNotFound("tuple has no record id".to_string()))?;

        if record_id.page_id.table_id != self.table_id {
            return Err(DbError::TableMismatch {
                record_id,
                table_id: self.table_id,
            });
        }

        let handle = bp.get_page(tid, record_id.page_id, Permissions::ReadWrite)?;
        handle.write()?.delete_tuple(tuple)?;
        Ok(vec![handle])
    }

    /// Lazily scans every record of the file through the buffer pool.
    pub fn iter(self: &Arc<Self>, bp: &Arc<BufferPool>, tid: TransactionId) -> HeapFileIter {
        HeapFileIter {
            file: Arc::clone(self),
            bp: Arc::clone(bp),
            tid,
            next_page: 0,
            buffered: VecDeque::new(),
            done: false,
        }
    }
}

/// Sequential scan over a [`HeapFile`]. Each page is fetched `ReadOnly`
/// through the buffer pool when the previous one is exhausted; its records
/// are copied out so no page guard outlives a call to `next`.
///
/// The first error ends the scan until [`HeapFileIter::rewind`].
pub struct HeapFileIter {
    file: Arc<HeapFile>,
    bp: Arc<BufferPool>,
    tid: TransactionId,
    next_page: u32,
    buffered: VecDeque<Tuple>,
    done: bool,
}

impl HeapFileIter {
    /// Restarts the scan from page 0.
    pub fn rewind(&mut self) {
        self.next_page = 0;
        self.buffered.clear();
        self.done = false;
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.file.schema()
    }
}

impl Iterator for HeapFileIter {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffered.pop_front() {
                return Some(Ok(tuple));
            }
            if self.done || self.next_page >= self.file.num_pages() {
                return None;
            }

            let page_id = PageId::new(self.file.table_id(), self.next_page);
            match self.bp.get_page(self.tid, page_id, Permissions::ReadOnly) {
                Ok(handle) => {
                    self.buffered.extend(handle.read().tuples().cloned());
                    self.next_page += 1;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
