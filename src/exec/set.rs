// src/exec/set.rs

//! Named worker pools built from `[executor.<name>]` sections.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::info;

use crate::config::ConfigFile;
use crate::errors::{JobflowError, Result};
use crate::exec::pool::PoolExecutor;

/// Set of independent pools, one per configured name.
///
/// Pools are shared by every job started from this set; the set only hands
/// out references and never creates pools per job.
#[derive(Debug, Default)]
pub struct ExecutorSet {
    pools: BTreeMap<String, Arc<PoolExecutor>>,
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one pool per `[executor.<name>]` on the given runtime.
    pub fn from_config(cfg: &ConfigFile, runtime: &Handle) -> Self {
        let mut set = Self::new();
        for (name, executor) in cfg.executor.iter() {
            info!(executor = %name, workers = executor.workers, "creating executor pool");
            set.insert(PoolExecutor::new(name.clone(), executor.workers, runtime.clone()));
        }
        set
    }

    /// Add (or replace) a pool under its own name.
    pub fn insert(&mut self, pool: PoolExecutor) -> Arc<PoolExecutor> {
        let name = pool.name().to_string();
        let pool = Arc::new(pool);
        self.pools.insert(name, Arc::clone(&pool));
        pool
    }

    pub fn get(&self, name: &str) -> Result<Arc<PoolExecutor>> {
        self.pools
            .get(name)
            .cloned()
            .ok_or_else(|| JobflowError::UnknownExecutor(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Close every pool; pending and later submissions fail.
    pub fn close_all(&self) {
        for pool in self.pools.values() {
            pool.close();
        }
    }
}
