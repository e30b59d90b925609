//! Native pull-stream adapters: the `pull_read` callback, native buffers and
//! read tokens, and the native stream handle driven by the output pump.

use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};

use bridge_core::config::BridgeConfig;
use bridge_core::constants::READ_FAILED;
use bridge_core::stream::{
    bridge_stream, HostSource, NativeBuffer, NativeStream, OutputStream, ReadFuture, ReadOperation,
    StreamInputBridge,
};
use bridge_core::types::BridgeError;
use bridge_core::utils::panic_message;
use bytes::Bytes;
use futures::FutureExt;
use libc::c_void;

use crate::api::{NativeApi, SendPtr};

// ---- input side ----

/// Buffer handed to `pull_read`. Valid until the operation is finished or
/// the stream is destroyed; the input bridge writes only under the session
/// lock with the session still open.
pub struct RawBuffer {
    ptr: SendPtr<u8>,
    len: usize,
}

impl NativeBuffer for RawBuffer {
    fn capacity(&self) -> usize {
        self.len
    }

    fn copy_from(&mut self, data: &[u8]) {
        let n = data.len().min(self.len);
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.0, n) };
    }
}

pub struct FfiReadOperation {
    api: NativeApi,
    operation: SendPtr<c_void>,
}

impl ReadOperation for FfiReadOperation {
    fn finish(self: Box<Self>, result: i64) {
        unsafe { (self.api.read_operation_finish)(self.operation.0, result) }
    }
}

/// What `user_data` points at in `bridge_pull_read`. Must stay at a fixed
/// address for as long as the native stream exists.
pub struct FfiInputBridge {
    api: NativeApi,
    bridge: StreamInputBridge,
}

impl FfiInputBridge {
    pub fn new(api: NativeApi, bridge: StreamInputBridge) -> Self {
        Self { api, bridge }
    }

    fn read(&self, buffer: *mut u8, size: i64, operation: *mut c_void) {
        let operation = FfiReadOperation { api: self.api, operation: SendPtr(operation) };
        if buffer.is_null() || size < 0 {
            tracing::error!(size, "pull read with an invalid buffer");
            Box::new(operation).finish(READ_FAILED);
            return;
        }
        let len = size as usize;
        self.bridge.read(RawBuffer { ptr: SendPtr(buffer), len }, len, operation);
    }
}

/// Native pull-read callback.
///
/// # Safety
/// `user_data` points at a live [`FfiInputBridge`]; `buffer` holds `size`
/// writable bytes until `operation` is finished or the stream destroyed.
#[no_mangle]
pub unsafe extern "C" fn bridge_pull_read(buffer: *mut u8, size: i64, operation: *mut c_void, user_data: *mut c_void) {
    let input = match (user_data as *const FfiInputBridge).as_ref() {
        Some(input) => input,
        None => {
            tracing::error!("pull read without an input bridge");
            std::process::abort();
        }
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| input.read(buffer, size, operation)));
    if let Err(payload) = outcome {
        tracing::error!(reason = %panic_message(payload.as_ref()), "fatal error scheduling pull read");
        std::process::abort();
    }
}

// ---- output side ----

pub struct FfiNativeStream {
    api: NativeApi,
    handle: SendPtr<c_void>,
}

impl FfiNativeStream {
    /// # Safety
    /// `handle` is a live native stream, destroyed only through this value.
    pub unsafe fn new(api: NativeApi, handle: *mut c_void) -> Self {
        Self { api, handle: SendPtr(handle) }
    }
}

impl NativeStream for FfiNativeStream {
    fn read(&mut self, max_size: usize) -> ReadFuture {
        let api = self.api;
        let mut buf = vec![0u8; max_size];
        let future = SendPtr(unsafe { (api.stream_read)(self.handle.0, buf.as_mut_ptr(), max_size as i64) });

        // The engine writes into `buf` until the future resolves, so it is
        // moved in here and only read after the wait.
        async move {
            let n = unsafe { api.wait_future(future.get()) }? as usize;
            if n > buf.len() {
                return Err(BridgeError::Programming("native read reported more bytes than requested"));
            }
            buf.truncate(n);
            Ok(Bytes::from(buf))
        }
        .boxed()
    }

    fn destroy(self: Box<Self>) -> Result<(), BridgeError> {
        unsafe { self.api.wait_future((self.api.stream_close)(self.handle.0)) }.map(|_| ())
    }
}

// ---- host-facing stream ----

/// Output stream plus the input bridge its native stream calls back into.
/// `output` is declared first so it is closed before `_input` is freed.
pub struct FfiStream {
    output: OutputStream,
    _input: Box<FfiInputBridge>,
}

impl FfiStream {
    pub fn close(&mut self) -> Result<(), BridgeError> {
        self.output.close()
    }
}

impl Read for FfiStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.output.read(buf)
    }
}

/// Open a bridged stream. `start` receives the `user_data` to register with
/// [`bridge_pull_read`] and returns the native stream handle.
pub fn open_stream<S, F>(api: NativeApi, source: S, config: &BridgeConfig, start: F) -> Result<FfiStream, BridgeError>
where
    S: HostSource,
    F: FnOnce(*mut c_void) -> Result<*mut c_void, BridgeError>,
{
    let mut input_slot: Option<Box<FfiInputBridge>> = None;
    let output = bridge_stream(source, config, |bridge| {
        let input = Box::new(FfiInputBridge::new(api, bridge));
        let user_data = &*input as *const FfiInputBridge as *mut c_void;
        input_slot = Some(input);
        let handle = start(user_data)?;
        if handle.is_null() {
            return Err(BridgeError::Programming("native stream handle is null"));
        }
        Ok(Box::new(unsafe { FfiNativeStream::new(api, handle) }) as Box<dyn NativeStream>)
    })?;

    let input = input_slot.ok_or(BridgeError::Programming("input bridge was not created"))?;
    Ok(FfiStream { output, _input: input })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::Ordering;

    use bridge_core::stream::{ReaderSource, StreamSession};

    use super::*;
    use crate::api::testing::{self, api};

    #[test]
    fn raw_buffer_copies_into_native_memory() {
        let mut region = [0u8; 8];
        let mut buffer = RawBuffer { ptr: SendPtr(region.as_mut_ptr()), len: region.len() };
        buffer.copy_from(b"abc");
        assert_eq!(&region[..4], b"abc\0");
    }

    #[test]
    fn native_stream_read_returns_written_bytes() {
        let mut stream = unsafe { FfiNativeStream::new(api(), 0x1 as *mut c_void) };
        let chunk = futures::executor::block_on(stream.read(5)).unwrap();
        assert_eq!(chunk, Bytes::from_static(b"zzzzz"));
    }

    #[test]
    fn pull_read_fills_buffer_and_finishes() {
        let session = StreamSession::with_source(Box::new(ReaderSource::new(Cursor::new(b"hi".to_vec()))));
        let input = FfiInputBridge::new(api(), StreamInputBridge::new(session).unwrap());

        let mut region = [0u8; 4];
        unsafe {
            bridge_pull_read(
                region.as_mut_ptr(),
                region.len() as i64,
                std::ptr::null_mut(),
                &input as *const FfiInputBridge as *mut c_void,
            )
        };

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while testing::FINISHED.load(Ordering::SeqCst) != 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(testing::FINISHED.load(Ordering::SeqCst), 2);
        assert_eq!(&region[..2], b"hi");
    }

    #[test]
    fn open_stream_reads_native_output_and_closes_once() {
        let source = ReaderSource::new(Cursor::new(Vec::new()));
        let config = BridgeConfig { read_chunk_size: 3, ..Default::default() };
        let before = testing::CLOSES.load(Ordering::SeqCst);

        let mut stream = open_stream(api(), source, &config, |user_data| {
            assert!(!user_data.is_null());
            Ok(0x1 as *mut c_void)
        })
        .unwrap();

        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"zzz");

        stream.close().unwrap();
        assert_eq!(testing::CLOSES.load(Ordering::SeqCst), before + 1);
        assert!(matches!(stream.close(), Err(BridgeError::Programming(_))));
    }
}
