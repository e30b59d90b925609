//! stream: adapters between blocking host I/O and a native pull-stream.
//!
//! One [`StreamSession`] is shared by a [`StreamInputBridge`] (host source
//! feeding native pull reads) and a [`StreamOutputBridge`] (native
//! pull-stream pumped into a host sink). Both halves use the session's
//! single lock before touching the native handle, a read buffer, or a
//! completion token.

pub mod core;
pub mod input;
pub mod io;
pub mod native;
pub mod output;
pub mod session;

pub use self::core::{bridge_input_source, bridge_stream, OutputStream};
pub use input::StreamInputBridge;
pub use io::{open_input, pipe, HostSink, HostSource, InputSource, PipeReader, PipeWriter, ReaderSource, WriterSink};
pub use native::{operation_fn, NativeBuffer, NativeStream, ReadFuture, ReadOperation};
pub use output::StreamOutputBridge;
pub use session::StreamSession;
