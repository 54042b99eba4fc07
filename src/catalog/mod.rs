mod catalog;
mod schema_loader;

pub use catalog::*;
