//! Lazily built, fork-aware handle to the process's worker pool.
//!
//! The fork collaborator must call [`SharedWorkerPool::reset`] around
//! `fork()`. If it does not, the next `push` notices the pid change and
//! rebuilds anyway, since the parent's threads do not exist in the child.

use std::process;
use std::sync::Mutex;

use crate::types::BridgeError;
use crate::utils::lock_unpoisoned;

use super::pool::WorkerPool;

struct PoolSlot {
    pid: u32,
    pool: WorkerPool,
}

pub struct SharedWorkerPool {
    size: usize,
    slot: Mutex<Option<PoolSlot>>,
}

impl SharedWorkerPool {
    /// No threads are started until the first `push`.
    pub fn new(size: usize) -> Self {
        Self { size, slot: Mutex::new(None) }
    }

    pub fn push<F>(&self, job: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let pid = process::id();
        let mut slot = lock_unpoisoned(&self.slot);

        if slot.as_ref().is_some_and(|current| current.pid != pid) {
            if let Some(stale) = slot.take() {
                tracing::warn!(old_pid = stale.pid, pid, "worker pool inherited across fork without reset, rebuilding");
                stale.pool.abandon();
            }
        }

        if slot.is_none() {
            tracing::info!(pid, size = self.size, "http worker pool init");
            *slot = Some(PoolSlot { pid, pool: WorkerPool::new(self.size)? });
        }

        match slot.as_ref() {
            Some(current) => current.pool.push(job),
            None => Err(BridgeError::Programming("worker pool missing after init")),
        }
    }

    /// Discard the queue and threads. A fresh pool is built on the next push.
    pub fn reset(&self) {
        let stale = lock_unpoisoned(&self.slot).take();
        if let Some(stale) = stale {
            tracing::info!(pid = process::id(), queued = stale.pool.queued(), "resetting http worker pool");
            stale.pool.abandon();
        }
    }

    pub fn is_initialized(&self) -> bool {
        lock_unpoisoned(&self.slot).is_some()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
