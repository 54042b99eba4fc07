//! Page-granularity shared/exclusive locks.
//!
//! Every lock request is answered by [`decide`], a pure function of the
//! page's current holders. [`LockManager`] applies its answer under one
//! mutex; requests that must wait sleep on a condvar that is notified on
//! every release and then report "not granted" so the caller can retry
//! against its own deadline.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use parking_lot::{Condvar, Mutex};

use crate::common::{DbError, PageId, Result, TransactionId};

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

/// Holders of one page's lock.
pub type Holders = HashMap<TransactionId, LockMode>;

/// Outcome of a lock request against a page's current holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDecision {
    /// Record the requested mode (or keep a stronger one already held).
    Grant,
    /// Convert the requester's sole Shared lock to Exclusive in place.
    Upgrade,
    /// Incompatible with another holder; retry later.
    Wait,
    /// Upgrade denied because other transactions share the page.
    Abort,
}

/// Grant rules for `tid` asking for `mode` on a page held by `holders`.
pub fn decide(holders: &Holders, tid: TransactionId, mode: LockMode) -> LockDecision {
    if holders.is_empty() {
        return LockDecision::Grant;
    }

    match (holders.get(&tid), mode) {
        (Some(LockMode::Exclusive), _) => LockDecision::Grant,
        (Some(LockMode::Shared), LockMode::Shared) => LockDecision::Grant,
        (Some(LockMode::Shared), LockMode::Exclusive) => {
            if holders.len() == 1 {
                LockDecision::Upgrade
            } else {
                LockDecision::Abort
            }
        }
        (None, LockMode::Exclusive) => LockDecision::Wait,
        (None, LockMode::Shared) => {
            // Several holders are necessarily all Shared; a single holder may be either.
            if holders.values().all(|m| *m == LockMode::Shared) {
                LockDecision::Grant
            } else {
                LockDecision::Wait
            }
        }
    }
}

/// Lock table: `PageId -> (TransactionId -> LockMode)`.
pub struct LockManager {
    table: Mutex<HashMap<PageId, Holders>>,
    released: Condvar,
    /// Wait when the page has a single holder; a shared cohort waits twice as long.
    lock_wait: Duration,
}

impl LockManager {
    pub fn new(lock_wait: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            lock_wait,
        }
    }

    /// Tries to lock `page_id` for `tid`.
    ///
    /// Returns `Ok(true)` when granted, `Ok(false)` after a bounded wait
    /// when the request conflicts, and `TransactionAborted` when an upgrade
    /// is denied.
    pub fn acquire_lock(&self, page_id: PageId, tid: TransactionId, mode: LockMode) -> Result<bool> {
        let mut table = self.table.lock();

        let (decision, holder_count) = match table.get(&page_id) {
            Some(holders) => (decide(holders, tid, mode), holders.len()),
            None => (LockDecision::Grant, 0),
        };

        match decision {
            LockDecision::Grant => {
                table.entry(page_id).or_default().entry(tid).or_insert(mode);
                Ok(true)
            }
            LockDecision::Upgrade => {
                table.entry(page_id).or_default().insert(tid, LockMode::Exclusive);
                Ok(true)
            }
            LockDecision::Abort => {
                debug!("{} denied upgrade on {} ({} holders)", tid, page_id, holder_count);
                Err(DbError::aborted(
                    tid,
                    format!("lock upgrade on {} denied, page is shared", page_id),
                ))
            }
            LockDecision::Wait => {
                let wait = if holder_count > 1 {
                    self.lock_wait * 2
                } else {
                    self.lock_wait
                };
                debug!("{} waiting {:?} for {:?} on {}", tid, wait, mode, page_id);
                self.released.wait_for(&mut table, wait);
                Ok(false)
            }
        }
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tid, page_id).is_some()
    }

    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<LockMode> {
        self.table
            .lock()
            .get(&page_id)
            .and_then(|holders| holders.get(&tid).copied())
    }

    /// Releases `tid`'s lock on `page_id` and wakes every waiter.
    /// Returns whether a lock was held.
    pub fn release_page(&self, tid: TransactionId, page_id: PageId) -> bool {
        let mut table = self.table.lock();

        let removed = match table.get_mut(&page_id) {
            Some(holders) => {
                let removed = holders.remove(&tid).is_some();
                if holders.is_empty() {
                    table.remove(&page_id);
                }
                removed
            }
            None => false,
        };

        if removed {
            self.released.notify_all();
        }
        removed
    }

    /// Every page `tid` holds a lock on.
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .iter()
            .filter(|(_, holders)| holders.contains_key(&tid))
            .map(|(page_id, _)| *page_id)
            .collect()
    }

    /// Releases every lock `tid` holds. Returns how many were released.
    pub fn release_all(&self, tid: TransactionId) -> usize {
        let mut table = self.table.lock();

        let mut released = 0;
        table.retain(|_, holders| {
            if holders.remove(&tid).is_some() {
                released += 1;
            }
            !holders.is_empty()
        });

        if released > 0 {
            self.released.notify_all();
        }
        released
    }

    /// Current holders of a page, for inspection.
    pub fn holders(&self, page_id: PageId) -> Holders {
        self.table.lock().get(&page_id).cloned().unwrap_or_default()
    }
}
