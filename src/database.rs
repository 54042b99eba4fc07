use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{Config, Result};
use crate::concurrency::Transaction;

/// One catalog and one buffer pool wired together.
pub struct Database {
    config: Config,
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// An empty database; register tables through [`Database::catalog`].
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config.clone(), Arc::clone(&catalog)));
        Self {
            config,
            catalog,
            buffer_pool,
        }
    }

    /// A database with the tables declared in `schema_path` loaded. The
    /// buffer pool starts empty, so every page is decoded with the schema
    /// just loaded.
    pub fn open<P: AsRef<Path>>(config: Config, schema_path: P) -> Result<Self> {
        let db = Self::new(config);
        db.catalog.load_schema(schema_path, db.config.page_size)?;
        Ok(db)
    }

    pub fn begin(&self) -> Transaction {
        Transaction::begin(Arc::clone(&self.buffer_pool))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
