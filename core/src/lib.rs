//! bridge-core
//!
//! Concurrency bridge between a host that only offers blocking I/O and a
//! native encryption engine driven by pull-read callbacks and futures.
//! No FFI here: raw pointers and `extern "C"` live in the ffi crate.

#![forbid(unsafe_code)]

// Shared and top level
pub mod config;
pub mod constants;
pub mod types;
pub mod utils;

pub mod telemetry;

// Outbound HTTP
pub mod http;
pub mod scheduler;

// Stream layers
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::{BridgeConfig, ClientIdentity};
    pub use crate::http::{
        HttpHeader, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestDispatcher,
        RequestId, ResponseSink, TransportError, TransportResponse,
    };
    pub use crate::scheduler::{SharedWorkerPool, WorkerPool};
    pub use crate::stream::{
        bridge_stream, HostSink, HostSource, NativeBuffer, NativeStream, OutputStream,
        ReadFuture, ReadOperation, StreamInputBridge, StreamOutputBridge, StreamSession,
    };
    pub use crate::types::{BridgeError, ErrorCode};
}
