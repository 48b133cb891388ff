// src/exec/mod.rs

//! Execution layer.
//!
//! Executors are opaque worker pools: they run a task body and report its
//! outcome through a single completion continuation. The scheduling engine
//! assumes nothing about ordering or thread affinity.
//!
//! - [`backend`] defines the [`Executor`] trait and the synchronous
//!   [`InlineExecutor`].
//! - [`pool`] provides [`PoolExecutor`], a named pool with its own
//!   concurrency bound running bodies on Tokio's blocking threads.
//! - [`set`] builds the named pools declared in the config.

pub mod backend;
pub mod pool;
pub mod set;

pub use backend::{panic_message, Executor, InlineExecutor, OnDone, WorkUnit};
pub use pool::PoolExecutor;
pub use set::ExecutorSet;
