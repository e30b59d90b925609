//! bridge-ffi
//!
//! C entry points for the native engine, built on bridge-core.
//! The engine integration passes in a [`NativeApi`] table; every call
//! back into native code goes through it.

pub mod api;
pub mod http;
pub mod log;
pub mod stream;

pub use api::{CError, CHttpHeader, CHttpRequest, CHttpResponse, CLogRecord, NativeApi, SendPtr};
pub use http::{bridge_http_cancel, bridge_http_send, FfiHttpClient, FfiResponseSink};
pub use log::{bridge_log_handler, install_log_handler};
pub use stream::{bridge_pull_read, open_stream, FfiInputBridge, FfiNativeStream, FfiStream};
