use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{DbError, PageId, Permissions, Result};
use crate::storage::page::HeapPage;

/// Shared, lockable cached page
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Capability returned by [`BufferPool::get_page`](super::BufferPool::get_page).
///
/// Holding a handle means the transaction holds the page lock matching
/// its permissions. Any handle can be read; only a `ReadWrite` handle
/// can be written.
///
/// Guards must not be held across calls back into the buffer pool.
#[derive(Clone)]
pub struct PageHandle {
    page_id: PageId,
    permissions: Permissions,
    page: PageRef,
}

impl PageHandle {
    pub(crate) fn new(page_id: PageId, permissions: Permissions, page: PageRef) -> Self {
        Self {
            page_id,
            permissions,
            page,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn read(&self) -> RwLockReadGuard<'_, HeapPage> {
        self.page.read()
    }

    /// Mutable access; fails with `ReadOnlyPage` on a `ReadOnly` handle.
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, HeapPage>> {
        match self.permissions {
            Permissions::ReadWrite => Ok(self.page.write()),
            Permissions::ReadOnly => Err(DbError::ReadOnlyPage(self.page_id)),
        }
    }

    pub(crate) fn page_ref(&self) -> &PageRef {
        &self.page
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("permissions", &self.permissions)
            .finish()
    }
}
