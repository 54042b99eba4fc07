use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::catalog::Catalog;
use crate::common::{Config, DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, LockMode};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

use super::{LruKReplacer, PageHandle, PageRef};

/// Cache state, guarded as one unit
struct PoolState {
    /// Cached pages by id
    pages: HashMap<PageId, PageRef>,
    /// Ranks clean pages for eviction
    replacer: LruKReplacer,
}

/// BufferPool is the only path by which pages are read or changed.
///
/// Every [`get_page`](BufferPool::get_page) first takes the page lock from
/// the [`LockManager`], then serves the page from cache or reads it from
/// its table file. At most `capacity` pages are cached across all tables.
///
/// Eviction is NO-STEAL: only clean pages are evicted, ranked by an LRU-K
/// replacer. Commit is FORCE: a transaction's dirty pages are written
/// before its locks are released. Together these make abort a matter of
/// re-reading dirtied pages from disk.
///
/// Lock order is lock manager, then cache mutex, then page lock. Callers
/// must drop page guards before calling back into the pool.
pub struct BufferPool {
    capacity: usize,
    config: Config,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    state: Mutex<PoolState>,
}

impl BufferPool {
    pub fn new(config: Config, catalog: Arc<Catalog>) -> Self {
        Self {
            capacity: config.buffer_pool_pages.max(1),
            lock_manager: LockManager::new(config.lock_wait),
            state: Mutex::new(PoolState {
                pages: HashMap::new(),
                replacer: LruKReplacer::new(config.replacer_k),
            }),
            config,
            catalog,
        }
    }

    /// Locks `page_id` for `tid` (Shared for `ReadOnly`, Exclusive for
    /// `ReadWrite`) and returns the cached page, loading it on a miss.
    ///
    /// Lock requests are retried until a randomized deadline drawn from
    /// the configured timeout window; past it the transaction is aborted.
    pub fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        permissions: Permissions,
    ) -> Result<PageHandle> {
        // Pages past the end of the file are rejected before any lock is taken
        let num_pages = self.catalog.file(page_id.table_id)?.num_pages();
        if page_id.page_no >= num_pages {
            return Err(DbError::PageOutOfRange { page_id, num_pages });
        }

        self.acquire_lock(tid, page_id, permissions)?;

        let mut state = self.state.lock();

        if let Some(page) = state.pages.get(&page_id).cloned() {
            state.replacer.record_access(page_id);
            return Ok(PageHandle::new(page_id, permissions, page));
        }

        debug!("cache miss on {} for {}", page_id, tid);
        if state.pages.len() >= self.capacity {
            Self::evict_page(&mut state)?;
        }

        let page = self.catalog.file(page_id.table_id)?.read_page(page_id)?;
        let page = Arc::new(RwLock::new(page));
        state.pages.insert(page_id, Arc::clone(&page));
        state.replacer.record_access(page_id);

        Ok(PageHandle::new(page_id, permissions, page))
    }

    fn acquire_lock(
        &self,
        tid: TransactionId,
        page_id: PageId,
        permissions: Permissions,
    ) -> Result<()> {
        let mode = match permissions {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };

        let min = self.config.lock_timeout_min;
        let timeout = rand::thread_rng().gen_range(min..=self.config.lock_timeout_max.max(min));
        let deadline = Instant::now() + timeout;

        while !self.lock_manager.acquire_lock(page_id, tid, mode)? {
            if Instant::now() >= deadline {
                warn!(
                    "{} timed out after {:?} waiting for {:?} on {}",
                    tid, timeout, mode, page_id
                );
                return Err(DbError::aborted(
                    tid,
                    format!("timed out waiting for {:?} lock on {}", mode, page_id),
                ));
            }
        }
        Ok(())
    }

    /// Discards the best-ranked clean page. Fails when every cached page is dirty.
    fn evict_page(state: &mut PoolState) -> Result<()> {
        let PoolState { pages, replacer } = state;

        let victim = replacer.evict(|page_id| {
            pages
                .get(page_id)
                .is_some_and(|page| page.read().is_dirty().is_none())
        });

        match victim {
            Some(page_id) => {
                debug!("evicting {}", page_id);
                pages.remove(&page_id);
                Ok(())
            }
            None => Err(DbError::AllPagesDirty),
        }
    }

    /// Inserts `tuple` into table `table_id` on behalf of `tid`. The page it
    /// lands on is marked dirty and stays cached until `tid` completes.
    pub fn insert_tuple(&self, tid: TransactionId, table_id: TableId, tuple: Tuple) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let pages = file.insert_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Deletes `tuple` (located by its record id) on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::RecordNotFound("tuple has no record id".to_string()))?;
        let file = self.catalog.file(record_id.page_id.table_id)?;
        let pages = file.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, pages)
    }

    /// Marks modified pages dirty and (re)installs them in the cache.
    fn install_dirty(&self, tid: TransactionId, pages: Vec<PageHandle>) -> Result<()> {
        for handle in pages {
            handle.write()?.mark_dirty(true, tid);

            let page_id = handle.page_id();
            let mut state = self.state.lock();
            if !state.pages.contains_key(&page_id) && state.pages.len() >= self.capacity {
                Self::evict_page(&mut state)?;
            }
            state.pages.insert(page_id, Arc::clone(handle.page_ref()));
            state.replacer.record_access(page_id);
        }
        Ok(())
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds_lock(tid, page_id)
    }

    /// Releases one page lock early. Only safe when `tid` has not read or
    /// written the page in a way it relies on.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.release_page(tid, page_id)
    }

    /// Ends `tid`: on commit its dirty pages are written, on abort they are
    /// reloaded from disk. Every lock it holds is then released, even when
    /// the write-back failed.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let result = {
            let state = self.state.lock();
            if commit {
                self.flush_dirtied_by(&state, tid)
            } else {
                self.reload_dirtied_by(&state, tid)
            }
        };

        let released = self.lock_manager.release_all(tid);
        match (&result, commit) {
            (Ok(()), true) => info!("{} committed, released {} locks", tid, released),
            (Ok(()), false) => warn!("{} aborted, released {} locks", tid, released),
            (Err(e), _) => warn!("{} did not complete cleanly: {}", tid, e),
        }
        result
    }

    /// Commits `tid`.
    pub fn transaction_complete_default(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, true)
    }

    fn dirtied_by(state: &PoolState, tid: TransactionId) -> Vec<(PageId, PageRef)> {
        state
            .pages
            .iter()
            .filter(|(_, page)| page.read().is_dirty() == Some(tid))
            .map(|(page_id, page)| (*page_id, Arc::clone(page)))
            .collect()
    }

    fn flush_dirtied_by(&self, state: &PoolState, tid: TransactionId) -> Result<()> {
        for (_, page) in Self::dirtied_by(state, tid) {
            self.write_back(&mut page.write())?;
        }
        Ok(())
    }

    fn reload_dirtied_by(&self, state: &PoolState, tid: TransactionId) -> Result<()> {
        for (page_id, page) in Self::dirtied_by(state, tid) {
            let fresh = self.catalog.file(page_id.table_id)?.read_page(page_id)?;
            debug!("{} rolled back {}", tid, page_id);
            *page.write() = fresh;
        }
        Ok(())
    }

    /// Writes a page if dirty, clears its dirty flag and makes the written
    /// bytes its new before-image.
    fn write_back(&self, page: &mut HeapPage) -> Result<()> {
        if let Some(tid) = page.is_dirty() {
            self.catalog.file(page.page_id().table_id)?.write_page(page)?;
            page.mark_dirty(false, tid);
            page.set_before_image()?;
        }
        Ok(())
    }

    /// Writes every dirty cached page of `tid` without ending it.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let state = self.state.lock();
        self.flush_dirtied_by(&state, tid)
    }

    /// Writes one cached page if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let state = self.state.lock();
        match state.pages.get(&page_id) {
            Some(page) => self.write_back(&mut page.write()),
            None => Ok(()),
        }
    }

    /// Writes every dirty cached page. Uncommitted changes go to disk too,
    /// so this is for shutdown and checkpoints only.
    pub fn flush_all_pages(&self) -> Result<()> {
        let state = self.state.lock();
        for page in state.pages.values() {
            self.write_back(&mut page.write())?;
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        let mut state = self.state.lock();
        state.pages.remove(&page_id);
        state.replacer.remove(page_id);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached pages.
    pub fn cached_pages(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.state.lock().pages.contains_key(&page_id)
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
