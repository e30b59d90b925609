/// Number of long-lived workers draining the outbound HTTP queue.
pub const POOL_SIZE: usize = 4;

/// Bounded read issued against a native pull-stream by the output pump (1 MiB).
pub const READ_CHUNK_SIZE: usize = 1024 * 1024;

/// Chunks buffered between the output pump and the host consumer.
pub const DEFAULT_PIPE_CAPACITY: usize = 4;

/// Sentinel passed to `read_operation_finish` when the host source failed.
pub const READ_FAILED: i64 = -1;

/// First id handed out by a fresh request registry.
pub const FIRST_REQUEST_ID: u64 = 1;

/// Client identity headers, overwritten on every outbound request.
pub mod headers {
    pub const SDK_TYPE: &str = "X-Tanker-SdkType";
    pub const SDK_VERSION: &str = "X-Tanker-SdkVersion";
}

pub const DEFAULT_SDK_TYPE: &str = "sdk-rust";

/// Thread names, visible in debuggers and panic messages.
pub mod thread_names {
    pub const HTTP_WORKER: &str = "bridge-http";
    pub const STREAM_READER: &str = "bridge-stream-read";
    pub const STREAM_PUMP: &str = "bridge-stream-pump";
}
