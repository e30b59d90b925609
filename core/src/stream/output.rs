//! StreamOutputBridge: native pull-stream -> host sink.
//!
//! OPEN -> CLOSING (input closed and handle taken, under the lock)
//! -> CLOSED (native destroy called, outside the lock). A second
//! `close` finds no handle and fails.

use std::thread::{self, JoinHandle};

use futures::executor::block_on;

use crate::constants::thread_names;
use crate::types::BridgeError;

use super::input::close_locked;
use super::io::HostSink;
use super::native::NativeStream;
use super::session::StreamSession;

#[derive(Clone)]
pub struct StreamOutputBridge {
    session: StreamSession,
    chunk_size: usize,
}

impl StreamOutputBridge {
    /// Install `native` on the session. Fails if the session is closed or
    /// already has a handle.
    pub fn new(session: StreamSession, native: Box<dyn NativeStream>, chunk_size: usize) -> Result<Self, BridgeError> {
        if chunk_size == 0 {
            return Err(BridgeError::Config("read chunk size must be at least 1".into()));
        }
        session.install_native(native)?;
        Ok(Self { session, chunk_size })
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Copy the native stream into `sink` until end of stream.
    /// Returns the number of bytes written. Does not close the sink.
    pub fn pump<S: HostSink + ?Sized>(&self, sink: &mut S) -> Result<u64, BridgeError> {
        let mut total: u64 = 0;
        loop {
            let pending = {
                let mut state = self.session.lock();
                match state.native.as_mut() {
                    Some(native) => native.read(self.chunk_size),
                    None => return Err(BridgeError::canceled()),
                }
            };

            let chunk = block_on(pending)?;
            if chunk.is_empty() {
                return Ok(total);
            }
            sink.write_some(&chunk)?;
            total += chunk.len() as u64;
        }
    }

    /// Run [`pump`](Self::pump) on a background thread. Any error is
    /// recorded on the session before the sink is closed, so a consumer
    /// that sees end of data can then find it.
    pub fn spawn_pump<S: HostSink>(&self, mut sink: S) -> Result<JoinHandle<()>, BridgeError> {
        let bridge = self.clone();
        let handle = thread::Builder::new()
            .name(thread_names::STREAM_PUMP.to_string())
            .spawn(move || {
                match bridge.pump(&mut sink) {
                    Ok(total) => tracing::debug!(bytes = total, "stream pump reached end of stream"),
                    Err(e) => {
                        tracing::debug!(error = %e, "stream pump stopped");
                        bridge.session.lock().record_error(e);
                    }
                }
                if let Err(e) = sink.close() {
                    tracing::warn!(error = %e, "closing stream sink failed");
                }
            })?;
        Ok(handle)
    }

    /// Close the input half, take the handle under the lock, then destroy
    /// it outside the lock.
    pub fn close(&self) -> Result<(), BridgeError> {
        let native = {
            let mut state = self.session.lock();
            close_locked(&mut state);
            state.native.take()
        };

        match native {
            Some(native) => {
                tracing::debug!("destroying native stream");
                native.destroy()
            }
            None => {
                tracing::error!("close called on an already closed stream");
                Err(BridgeError::Programming("stream already closed"))
            }
        }
    }
}
