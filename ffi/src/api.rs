//! C layouts shared with the native engine, and the callback table.

use std::ffi::CStr;

use bridge_core::types::{BridgeError, ErrorCode};
use libc::{c_char, c_void};

#[repr(C)]
pub struct CHttpHeader {
    pub name: *const c_char,
    pub value: *const c_char,
}

#[repr(C)]
pub struct CHttpRequest {
    pub method: *const c_char,
    pub url: *const c_char,
    pub headers: *const CHttpHeader,
    pub num_headers: i32,
    pub body: *const c_char,
    pub body_size: i32,
}

/// `error_msg` non-null means failure; the other fields are then ignored.
#[repr(C)]
pub struct CHttpResponse {
    pub error_msg: *const c_char,
    pub headers: *const CHttpHeader,
    pub num_headers: i32,
    pub body: *const c_char,
    pub body_size: i64,
    pub status_code: i32,
}

#[repr(C)]
pub struct CError {
    pub code: i32,
    pub message: *const c_char,
}

#[repr(C)]
pub struct CLogRecord {
    pub category: *const c_char,
    pub level: u32,
    pub file: *const c_char,
    pub line: u32,
    pub message: *const c_char,
}

/// Native entry points this crate calls. Futures, streams and read
/// operations are opaque pointers owned by the engine.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub read_operation_finish: unsafe extern "C" fn(operation: *mut c_void, nb_read: i64),
    pub http_handle_response: unsafe extern "C" fn(request: *mut CHttpRequest, response: *const CHttpResponse),
    pub stream_read: unsafe extern "C" fn(stream: *mut c_void, buffer: *mut u8, size: i64) -> *mut c_void,
    pub stream_close: unsafe extern "C" fn(stream: *mut c_void) -> *mut c_void,
    pub future_wait: unsafe extern "C" fn(future: *mut c_void),
    pub future_has_error: unsafe extern "C" fn(future: *mut c_void) -> bool,
    pub future_get_error: unsafe extern "C" fn(future: *mut c_void) -> *const CError,
    pub future_get_voidptr: unsafe extern "C" fn(future: *mut c_void) -> *mut c_void,
    pub future_destroy: unsafe extern "C" fn(future: *mut c_void),
}

/// Raw pointer that may cross threads. Whoever wraps one vouches that the
/// pointee is safe to use from the receiving thread.
#[derive(Debug)]
pub struct SendPtr<T>(pub *mut T);

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

impl<T> SendPtr<T> {
    /// Use this rather than `.0` inside closures and async blocks, which
    /// would otherwise capture the bare pointer field.
    pub fn get(self) -> *mut T {
        self.0
    }
}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

/// Owned copy of a C string; null reads as empty.
///
/// # Safety
/// `ptr` is null or a valid NUL-terminated string.
pub unsafe fn cstr_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

impl NativeApi {
    /// Block on a native future, read its pointer result, and destroy it.
    ///
    /// # Safety
    /// `future` is null or a live future returned by this engine.
    pub unsafe fn wait_future(&self, future: *mut c_void) -> Result<*mut c_void, BridgeError> {
        if future.is_null() {
            return Err(BridgeError::Programming("native call returned a null future"));
        }
        (self.future_wait)(future);
        let result = if (self.future_has_error)(future) {
            Err(self.error_of(future))
        } else {
            Ok((self.future_get_voidptr)(future))
        };
        (self.future_destroy)(future);
        result
    }

    unsafe fn error_of(&self, future: *mut c_void) -> BridgeError {
        let error = (self.future_get_error)(future);
        match error.as_ref() {
            Some(e) => BridgeError::native(e.code, cstr_lossy(e.message)),
            None => BridgeError::Native {
                code: ErrorCode::InternalError,
                message: "native future failed without an error".into(),
            },
        }
    }
}
