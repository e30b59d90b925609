// ## src/scheduler/pool.rs

//! Fixed-size pool of long-lived workers draining one FIFO queue.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::constants::thread_names;
use crate::types::BridgeError;
use crate::utils::panic_message;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    rx: Receiver<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self, BridgeError> {
        if size == 0 {
            return Err(BridgeError::Config("worker pool needs at least one worker".into()));
        }

        let (tx, rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", thread_names::HTTP_WORKER, index))
                .spawn(move || worker_loop(index, rx))?;
            workers.push(handle);
        }

        Ok(Self { tx: Some(tx), rx, workers })
    }

    /// Enqueue a job. Never blocks.
    pub fn push<F>(&self, job: F) -> Result<(), BridgeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self
            .tx
            .as_ref()
            .ok_or(BridgeError::Programming("push on a shut down worker pool"))?;
        tx.send(Box::new(job))
            .map_err(|_| BridgeError::Programming("all pool workers have exited"))
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, Sender::len)
    }

    /// Close the queue, let workers drain it, and wait for them.
    pub fn shutdown(mut self) {
        self.tx = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("http worker exited with a panic");
            }
        }
    }

    /// Discard queued jobs and detach the threads without joining them.
    /// In a forked child the threads do not exist, so joining would hang.
    /// A job already running in the parent finishes; nothing queued does.
    pub fn abandon(mut self) {
        self.tx = None;
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            tracing::debug!(dropped, "discarded queued jobs");
        }
        self.workers.clear();
    }
}

impl Drop for WorkerPool {
    // Detach rather than join: a worker may be inside a long network call.
    fn drop(&mut self) {
        self.tx = None;
    }
}

fn worker_loop(index: usize, rx: Receiver<Job>) {
    tracing::debug!(worker = index, "http worker loop started");
    while let Ok(job) = rx.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            tracing::error!(worker = index, reason = %panic_message(payload.as_ref()), "worker job panicked");
        }
    }
    tracing::debug!(worker = index, "http worker loop exiting");
}
