//! telemetry/mod.rs
//! Dispatch counters, immutable snapshots, and forwarding of native log
//! records into `tracing`.

pub mod counters;
pub mod log_record;
pub mod snapshot;

pub use counters::*;
pub use log_record::*;
pub use snapshot::*;
