//! Seams towards the native engine's pull-stream API.
//!
//! The ffi crate implements these over raw pointers; tests implement them
//! in memory.

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::types::BridgeError;

/// Result of one bounded native read. An empty chunk is end of stream.
pub type ReadFuture = BoxFuture<'static, Result<Bytes, BridgeError>>;

/// Destination region the native engine handed to a pull read.
pub trait NativeBuffer: Send + 'static {
    fn capacity(&self) -> usize;

    /// Copy `data` to the start of the region. `data.len() <= capacity()`.
    fn copy_from(&mut self, data: &[u8]);
}

/// Completion token for one outstanding pull read.
///
/// `finish` must be called at most once. Dropping the token without
/// calling it abandons the operation.
pub trait ReadOperation: Send + 'static {
    /// Byte count, `0` for end of data, or a negative value on failure.
    fn finish(self: Box<Self>, result: i64);
}

struct FnReadOperation<F>(F);

impl<F> ReadOperation for FnReadOperation<F>
where
    F: FnOnce(i64) + Send + 'static,
{
    fn finish(self: Box<Self>, result: i64) {
        (self.0)(result)
    }
}

/// Wrap a closure as a read operation.
pub fn operation_fn<F>(f: F) -> impl ReadOperation
where
    F: FnOnce(i64) + Send + 'static,
{
    FnReadOperation(f)
}

/// Handle to a native pull-stream.
pub trait NativeStream: Send + 'static {
    /// Issue one read of at most `max_size` bytes.
    ///
    /// Called with the session lock held: this must only start the read.
    /// The returned future is awaited after the lock is released.
    fn read(&mut self, max_size: usize) -> ReadFuture;

    /// Tear the stream down. Runs outside the session lock and may block.
    fn destroy(self: Box<Self>) -> Result<(), BridgeError>;
}
