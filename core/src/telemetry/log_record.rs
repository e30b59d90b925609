//! telemetry/log_record.rs
//! Native engine log records, re-emitted as `tracing` events.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive)]
pub enum LogLevel {
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl LogLevel {
    /// Unknown levels are treated as informational.
    pub fn from_raw(raw: u32) -> Self {
        LogLevel::try_from_primitive(raw).unwrap_or(LogLevel::Info)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub category: String,
    pub level: LogLevel,
    pub file: String,
    pub line: u32,
    pub message: String,
}

/// Emit a native record under the `native` target.
pub fn forward_log(record: &LogRecord) {
    let LogRecord { category, level, file, line, message } = record;
    match level {
        LogLevel::Debug => {
            tracing::debug!(target: "native", category = %category, file = %file, line = *line, "{}", message)
        }
        LogLevel::Info => {
            tracing::info!(target: "native", category = %category, file = %file, line = *line, "{}", message)
        }
        LogLevel::Warning => {
            tracing::warn!(target: "native", category = %category, file = %file, line = *line, "{}", message)
        }
        LogLevel::Error => {
            tracing::error!(target: "native", category = %category, file = %file, line = *line, "{}", message)
        }
    }
}

static LOG_HANDLER_SET: AtomicBool = AtomicBool::new(false);

/// Mark the native log handler as installed, returning the previous state.
/// Callers install the default silent handler only when this returns `false`.
pub fn test_and_set_log_handler() -> bool {
    LOG_HANDLER_SET.swap(true, Ordering::AcqRel)
}
