//! Native log records -> `tracing`.

use std::panic::{self, AssertUnwindSafe};

use bridge_core::telemetry::{forward_log, test_and_set_log_handler, LogLevel, LogRecord};

use crate::api::{cstr_lossy, CLogRecord};

/// Signature of the engine's "set log handler" entry point.
pub type SetLogHandler = unsafe extern "C" fn(handler: unsafe extern "C" fn(*const CLogRecord));

/// Register [`bridge_log_handler`] with the engine unless a handler was
/// already installed in this process. Returns `true` if it installed it.
///
/// # Safety
/// `set_handler` is the engine's entry point.
pub unsafe fn install_log_handler(set_handler: SetLogHandler) -> bool {
    if test_and_set_log_handler() {
        return false;
    }
    set_handler(bridge_log_handler);
    true
}

/// # Safety
/// `record` is null or points at a valid record for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn bridge_log_handler(record: *const CLogRecord) {
    let Some(raw) = record.as_ref() else {
        return;
    };
    let record = LogRecord {
        category: cstr_lossy(raw.category),
        level: LogLevel::from_raw(raw.level),
        file: cstr_lossy(raw.file),
        line: raw.line,
        message: cstr_lossy(raw.message),
    };
    // Nothing sensible to report to the engine; drop the record.
    let _ = panic::catch_unwind(AssertUnwindSafe(|| forward_log(&record)));
}
