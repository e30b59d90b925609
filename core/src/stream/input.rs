//! StreamInputBridge: host source -> native pull reads.
//!
//! `read` only enqueues. A per-session reader thread performs the blocking
//! source read, then completes the token under the session lock, or
//! abandons it if the session was closed in the meantime.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::constants::{thread_names, READ_FAILED};
use crate::types::BridgeError;
use crate::utils::panic_message;

use super::io::HostSource;
use super::native::{NativeBuffer, ReadOperation};
use super::session::{SessionState, StreamSession};

struct ReadRequest {
    buffer: Box<dyn NativeBuffer>,
    max_size: usize,
    operation: Box<dyn ReadOperation>,
}

/// Cheap to clone; the reader thread stops once every clone is dropped.
#[derive(Clone)]
pub struct StreamInputBridge {
    session: StreamSession,
    tx: Sender<ReadRequest>,
}

impl StreamInputBridge {
    pub fn new(session: StreamSession) -> Result<Self, BridgeError> {
        let (tx, rx) = unbounded::<ReadRequest>();
        let reader_session = session.clone();
        thread::Builder::new()
            .name(thread_names::STREAM_READER.to_string())
            .spawn(move || reader_loop(reader_session, rx))?;
        Ok(Self { session, tx })
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Schedule a read of at most `max_size` bytes into `buffer`. Never blocks.
    pub fn read<B, O>(&self, buffer: B, max_size: usize, operation: O)
    where
        B: NativeBuffer,
        O: ReadOperation,
    {
        let request = ReadRequest { buffer: Box::new(buffer), max_size, operation: Box::new(operation) };
        // May run under the session lock (from `NativeStream::read`), so it
        // must not lock. The reader outlives every sender, so this only
        // fails if the thread could not be kept alive.
        if self.tx.send(request).is_err() {
            tracing::error!("stream reader thread has exited, read abandoned");
        }
    }

    /// Mark the session closed and close the source.
    /// Takes the session lock: calling this while holding it deadlocks.
    pub fn close(&self) {
        close_locked(&mut self.session.lock());
    }
}

/// Input half of a close, for callers already holding the lock. Idempotent.
pub(crate) fn close_locked(state: &mut SessionState) {
    state.closed = true;
    if let Some(mut source) = state.source.take() {
        close_source(source.as_mut());
    }
}

fn close_source(source: &mut dyn HostSource) {
    if let Err(e) = source.close() {
        tracing::warn!(error = %e, "closing stream source failed");
    }
}

fn reader_loop(session: StreamSession, rx: Receiver<ReadRequest>) {
    tracing::trace!("stream reader started");
    while let Ok(request) = rx.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| run_read(&session, request))) {
            tracing::error!(reason = %panic_message(payload.as_ref()), "stream read completion panicked");
        }
    }
    tracing::trace!("stream reader exiting");
}

fn run_read(session: &StreamSession, request: ReadRequest) {
    let ReadRequest { mut buffer, max_size, operation } = request;
    let wanted = max_size.min(buffer.capacity());

    let mut source = {
        let mut state = session.lock();
        if state.closed {
            tracing::debug!("read requested on a closed stream, abandoning");
            return;
        }
        // Completing with 0 would read as end of data.
        if wanted == 0 {
            state.record_error(BridgeError::Programming("pull read with no room for data"));
            operation.finish(READ_FAILED);
            return;
        }
        match state.source.take() {
            Some(source) => source,
            None => {
                state.record_error(BridgeError::Programming("stream source missing for read"));
                operation.finish(READ_FAILED);
                return;
            }
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| source.read_some(wanted)));

    let mut state = session.lock();
    if state.closed {
        drop(state);
        tracing::debug!("stream closed during read, result discarded");
        close_source(source.as_mut());
        return;
    }
    state.source = Some(source);

    match outcome {
        Ok(Ok(None)) => operation.finish(0),
        Ok(Ok(Some(bytes))) if bytes.len() <= wanted => {
            buffer.copy_from(&bytes);
            operation.finish(bytes.len() as i64);
        }
        Ok(Ok(Some(_))) => {
            state.record_error(BridgeError::Programming("stream source returned more bytes than requested"));
            operation.finish(READ_FAILED);
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "stream source read failed");
            state.record_error(BridgeError::Source(e));
            operation.finish(READ_FAILED);
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(reason = %msg, "stream source panicked");
            state.record_error(BridgeError::Source(io::Error::new(io::ErrorKind::Other, msg)));
            operation.finish(READ_FAILED);
        }
    }
}
