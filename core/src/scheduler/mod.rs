//! scheduler/mod.rs
//! Execution substrate for outbound HTTP dispatch.

pub mod pool;
pub mod shared;

pub use pool::{Job, WorkerPool};
pub use shared::SharedWorkerPool;
