// ## src/stream/core.rs
// ## Host-facing stream API

use std::io::{self, Read};
use std::thread::JoinHandle;

use crate::config::BridgeConfig;
use crate::types::BridgeError;

use super::input::StreamInputBridge;
use super::io::{open_input, pipe, HostSource, InputSource, PipeReader};
use super::native::NativeStream;
use super::output::StreamOutputBridge;
use super::session::StreamSession;

/// Readable end of a bridged stream.
///
/// A failure recorded by either bridge half is returned once, by the
/// first `read` after the data produced before it has been consumed.
pub struct OutputStream {
    reader: Option<PipeReader>,
    bridge: StreamOutputBridge,
    session: StreamSession,
    closed: bool,
    pump: Option<JoinHandle<()>>,
}

impl OutputStream {
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the whole chain: output bridge, input bridge, source.
    /// A second call returns `BridgeError::Programming`.
    pub fn close(&mut self) -> Result<(), BridgeError> {
        self.closed = true;
        // Unblocks a pump waiting on a full pipe.
        self.reader = None;
        let result = self.bridge.close();
        if let Some(pump) = self.pump.take() {
            if pump.is_finished() && pump.join().is_err() {
                tracing::warn!("stream pump exited with a panic");
            }
        }
        result
    }
}

impl Read for OutputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"))?;

        let n = reader.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(err) = self.session.take_error() {
                return Err(err.into());
            }
        }
        Ok(n)
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "closing dropped output stream failed");
        }
    }
}

/// Start a bridged stream over `source`.
///
/// `open` receives the input bridge to wire into the native encrypt or
/// decrypt call and returns the resulting pull-stream handle.
pub fn bridge_stream<S, F>(source: S, config: &BridgeConfig, open: F) -> Result<OutputStream, BridgeError>
where
    S: HostSource,
    F: FnOnce(StreamInputBridge) -> Result<Box<dyn NativeStream>, BridgeError>,
{
    config.validate()?;

    let session = StreamSession::with_source(Box::new(source));
    let input = StreamInputBridge::new(session.clone())?;
    let native = match open(input.clone()) {
        Ok(native) => native,
        Err(e) => {
            input.close();
            return Err(e);
        }
    };

    let bridge = match StreamOutputBridge::new(session.clone(), native, config.read_chunk_size) {
        Ok(bridge) => bridge,
        Err(e) => {
            input.close();
            return Err(e);
        }
    };
    let (writer, reader) = pipe(config.pipe_capacity);
    let pump = match bridge.spawn_pump(writer) {
        Ok(handle) => handle,
        Err(e) => {
            if let Err(close_err) = bridge.close() {
                tracing::warn!(error = %close_err, "closing stream after pump spawn failure");
            }
            return Err(e);
        }
    };

    tracing::debug!(chunk = config.read_chunk_size, "bridged stream opened");
    Ok(OutputStream { reader: Some(reader), bridge, session, closed: false, pump: Some(pump) })
}

/// [`bridge_stream`] over any canonical input source.
pub fn bridge_input_source<F>(src: InputSource, config: &BridgeConfig, open: F) -> Result<OutputStream, BridgeError>
where
    F: FnOnce(StreamInputBridge) -> Result<Box<dyn NativeStream>, BridgeError>,
{
    bridge_stream(open_input(src)?, config, open)
}
