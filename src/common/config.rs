use std::time::Duration;

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity in pages
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRUK_K: usize = 2;

/// Lower bound of the randomized per-request lock timeout
pub const DEFAULT_LOCK_TIMEOUT_MIN: Duration = Duration::from_millis(1000);

/// Upper bound of the randomized per-request lock timeout
pub const DEFAULT_LOCK_TIMEOUT_MAX: Duration = Duration::from_millis(3000);

/// How long a denied lock request sleeps before reporting "not granted"
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(10);

/// Fixed width of a string column declared as `string` in a schema file
pub const DEFAULT_STRING_LEN: u16 = 128;

/// Runtime configuration shared by the buffer pool, lock manager and table files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bytes per page, header included
    pub page_size: usize,
    /// Maximum number of cached pages
    pub buffer_pool_pages: usize,
    /// Randomized lock timeout window for `get_page`
    pub lock_timeout_min: Duration,
    pub lock_timeout_max: Duration,
    /// Bounded sleep of a waiting lock request
    pub lock_wait: Duration,
    /// K for the LRU-K replacer that ranks clean eviction candidates
    pub replacer_k: usize,
}

impl Config {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_timeout(mut self, min: Duration, max: Duration) -> Self {
        self.lock_timeout_min = min;
        self.lock_timeout_max = max.max(min);
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            lock_timeout_min: DEFAULT_LOCK_TIMEOUT_MIN,
            lock_timeout_max: DEFAULT_LOCK_TIMEOUT_MAX,
            lock_wait: DEFAULT_LOCK_WAIT,
            replacer_k: DEFAULT_LRUK_K,
        }
    }
}
