mod buffer_pool;
mod lru_k_replacer;
mod page_handle;

pub use buffer_pool::*;
pub use lru_k_replacer::*;
pub use page_handle::*;
