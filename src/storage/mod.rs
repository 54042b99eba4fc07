pub mod disk;
pub mod page;

mod heap_file;

pub use heap_file::*;
