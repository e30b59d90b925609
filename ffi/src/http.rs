//! HTTP send/cancel callbacks and delivery of responses to the engine.

use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bridge_core::config::BridgeConfig;
use bridge_core::http::{
    HttpHeader, HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestDispatcher, RequestId, ResponseSink,
};
use bridge_core::scheduler::SharedWorkerPool;
use bridge_core::telemetry::DispatchSnapshot;
use bridge_core::types::BridgeError;
use bridge_core::utils::panic_message;
use bytes::Bytes;
use libc::{c_char, c_void};

use crate::api::{cstr_lossy, CHttpHeader, CHttpRequest, CHttpResponse, NativeApi, SendPtr};

// ---- responses ----

/// A `CHttpResponse` together with the memory its pointers refer to.
struct OwnedResponse {
    _strings: Vec<CString>,
    _headers: Vec<CHttpHeader>,
    _body: Bytes,
    raw: CHttpResponse,
}

impl OwnedResponse {
    fn build(response: &HttpResponse) -> Result<Self, std::ffi::NulError> {
        match response {
            HttpResponse::Error { message } => {
                let message = CString::new(message.as_str())?;
                let raw = CHttpResponse {
                    error_msg: message.as_ptr(),
                    headers: std::ptr::null(),
                    num_headers: 0,
                    body: std::ptr::null(),
                    body_size: 0,
                    status_code: 0,
                };
                Ok(Self { _strings: vec![message], _headers: Vec::new(), _body: Bytes::new(), raw })
            }
            HttpResponse::Ok { status_code, headers, body } => {
                let mut strings = Vec::with_capacity(headers.len() * 2);
                for header in headers {
                    strings.push(CString::new(header.name.as_str())?);
                    strings.push(CString::new(header.value.as_str())?);
                }
                let c_headers: Vec<CHttpHeader> = strings
                    .chunks(2)
                    .map(|pair| CHttpHeader { name: pair[0].as_ptr(), value: pair[1].as_ptr() })
                    .collect();
                let body = body.clone();
                let raw = CHttpResponse {
                    error_msg: std::ptr::null(),
                    headers: c_headers.as_ptr(),
                    num_headers: c_headers.len() as i32,
                    body: body.as_ptr() as *const c_char,
                    body_size: body.len() as i64,
                    status_code: i32::from(*status_code),
                };
                Ok(Self { _strings: strings, _headers: c_headers, _body: body, raw })
            }
        }
    }
}

/// Hand `response` to the engine for `request`. Aborts if the response
/// cannot be represented, since the engine would otherwise wait forever.
///
/// # Safety
/// `request` is the live request pointer the engine passed to `http_send`.
unsafe fn send_response(api: &NativeApi, request: *mut CHttpRequest, response: &HttpResponse) {
    let owned = match OwnedResponse::build(response) {
        Ok(owned) => owned,
        Err(e) => {
            tracing::error!(error = %e, "fatal error building http response");
            std::process::abort();
        }
    };
    (api.http_handle_response)(request, &owned.raw);
}

pub struct FfiResponseSink {
    api: NativeApi,
}

impl FfiResponseSink {
    pub fn new(api: NativeApi) -> Self {
        Self { api }
    }
}

impl ResponseSink for FfiResponseSink {
    type Token = SendPtr<CHttpRequest>;

    fn deliver(&self, token: Self::Token, response: HttpResponse) {
        unsafe { send_response(&self.api, token.get(), &response) }
    }
}

// ---- requests ----

/// Copy a native request descriptor into owned Rust values.
///
/// # Safety
/// `request` is null or a valid descriptor whose pointers are live.
pub unsafe fn parse_request(request: *const CHttpRequest) -> Result<HttpRequest, BridgeError> {
    let raw = request
        .as_ref()
        .ok_or_else(|| BridgeError::InvalidArgument("null http request".into()))?;

    let method: HttpMethod = cstr_lossy(raw.method).parse()?;
    let url = cstr_lossy(raw.url);

    let count = usize::try_from(raw.num_headers)
        .map_err(|_| BridgeError::InvalidArgument(format!("negative header count {}", raw.num_headers)))?;
    let mut headers = Vec::with_capacity(count);
    if count > 0 {
        if raw.headers.is_null() {
            return Err(BridgeError::InvalidArgument("null header array".into()));
        }
        for h in std::slice::from_raw_parts(raw.headers, count) {
            headers.push(HttpHeader::new(cstr_lossy(h.name), cstr_lossy(h.value)));
        }
    }

    let body = match usize::try_from(raw.body_size) {
        Ok(len) if len > 0 && !raw.body.is_null() => {
            Bytes::copy_from_slice(std::slice::from_raw_parts(raw.body as *const u8, len))
        }
        _ => Bytes::new(),
    };

    Ok(HttpRequest { method, url, headers, body })
}

/// What `user_data` points at in the http callbacks.
pub struct FfiHttpClient {
    api: NativeApi,
    dispatcher: RequestDispatcher<Box<dyn HttpTransport>, FfiResponseSink>,
}

impl FfiHttpClient {
    pub fn new(
        api: NativeApi,
        transport: Box<dyn HttpTransport>,
        pool: Arc<SharedWorkerPool>,
        config: &BridgeConfig,
    ) -> Self {
        Self { api, dispatcher: RequestDispatcher::new(transport, FfiResponseSink::new(api), pool, config) }
    }

    pub fn counters(&self) -> DispatchSnapshot {
        self.dispatcher.counters()
    }

    unsafe fn send(&self, request: *mut CHttpRequest) -> Result<RequestId, BridgeError> {
        let parsed = parse_request(request)?;
        Ok(self.dispatcher.submit(parsed, SendPtr(request)))
    }

    /// Deliver an error synchronously for a request that was never registered.
    unsafe fn reject(&self, request: *mut CHttpRequest, message: String) {
        tracing::warn!(reason = %message, "rejecting http request");
        send_response(&self.api, request, &HttpResponse::error(message));
    }
}

unsafe fn client<'a>(user_data: *mut c_void, entry: &str) -> &'a FfiHttpClient {
    match (user_data as *const FfiHttpClient).as_ref() {
        Some(client) => client,
        None => {
            tracing::error!(entry, "http callback without a client");
            std::process::abort();
        }
    }
}

/// Native `http_send` callback. Returns the request id as an opaque handle,
/// or null if the request was rejected (its error is already delivered).
///
/// # Safety
/// `user_data` points at a live [`FfiHttpClient`]; `request` stays valid
/// until a response is delivered or the request is canceled.
#[no_mangle]
pub unsafe extern "C" fn bridge_http_send(request: *mut CHttpRequest, user_data: *mut c_void) -> *mut c_void {
    let client = client(user_data, "send");
    match panic::catch_unwind(AssertUnwindSafe(|| client.send(request))) {
        Ok(Ok(id)) => id as usize as *mut c_void,
        Ok(Err(e)) => {
            client.reject(request, e.to_string());
            std::ptr::null_mut()
        }
        Err(payload) => {
            client.reject(request, panic_message(payload.as_ref()));
            std::ptr::null_mut()
        }
    }
}

/// Native `http_cancel` callback.
///
/// # Safety
/// `user_data` points at a live [`FfiHttpClient`].
#[no_mangle]
pub unsafe extern "C" fn bridge_http_cancel(_request: *mut CHttpRequest, handle: *mut c_void, user_data: *mut c_void) {
    let client = client(user_data, "cancel");
    let id = handle as usize as RequestId;
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| client.dispatcher.cancel(id))) {
        tracing::error!(request_id = id, reason = %panic_message(payload.as_ref()), "fatal error canceling http request");
        std::process::abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bridge_core::http::{TransportError, TransportResponse};

    use super::*;
    use crate::api::testing::{api, RESPONSES};

    struct Fixed;

    impl HttpTransport for Fixed {
        fn send(&self, request: &HttpRequest) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse { status_code: 201, headers: Vec::new(), body: Bytes::from(request.url.clone()) })
        }
    }

    /// Keeps the C strings a `CHttpRequest` points at alive.
    struct CRequest {
        _method: CString,
        _url: CString,
        raw: CHttpRequest,
    }

    fn c_request(method: &str, url: &str) -> Box<CRequest> {
        let method = CString::new(method).unwrap();
        let url = CString::new(url).unwrap();
        let raw = CHttpRequest {
            method: method.as_ptr(),
            url: url.as_ptr(),
            headers: std::ptr::null(),
            num_headers: 0,
            body: std::ptr::null(),
            body_size: 0,
        };
        Box::new(CRequest { _method: method, _url: url, raw })
    }

    fn response_for(request: *mut CHttpRequest) -> Option<Result<(i32, Vec<u8>), String>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            // Taken, not peeked: a later test may reuse the same address.
            let found = {
                let mut log = RESPONSES.lock().unwrap();
                log.iter().position(|(addr, _)| *addr == request as usize).map(|i| log.remove(i).1)
            };
            if found.is_some() || Instant::now() > deadline {
                return found;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn client() -> FfiHttpClient {
        FfiHttpClient::new(api(), Box::new(Fixed), Arc::new(SharedWorkerPool::new(2)), &BridgeConfig::default())
    }

    #[test]
    fn parses_headers_and_body() {
        let name = CString::new("Accept").unwrap();
        let value = CString::new("*/*").unwrap();
        let headers = [CHttpHeader { name: name.as_ptr(), value: value.as_ptr() }];
        let body = b"{}";
        let mut req = c_request("POST", "https://example.test/p");
        req.raw.headers = headers.as_ptr();
        req.raw.num_headers = 1;
        req.raw.body = body.as_ptr() as *const c_char;
        req.raw.body_size = 2;

        let parsed = unsafe { parse_request(&req.raw) }.unwrap();
        assert_eq!(parsed.method, HttpMethod::Post);
        assert_eq!(parsed.url, "https://example.test/p");
        assert_eq!(parsed.headers, vec![HttpHeader::new("Accept", "*/*")]);
        assert_eq!(parsed.body, Bytes::from_static(b"{}"));
    }

    #[test]
    fn send_delivers_through_native_callback() {
        let client = client();
        let mut req = c_request("GET", "https://example.test/ok");
        let ptr = &mut req.raw as *mut CHttpRequest;

        let handle = unsafe { bridge_http_send(ptr, &client as *const FfiHttpClient as *mut c_void) };
        assert!(!handle.is_null());

        let response = response_for(ptr).unwrap();
        assert_eq!(response, Ok((201, b"https://example.test/ok".to_vec())));
    }

    #[test]
    fn unknown_method_is_rejected_immediately() {
        let client = client();
        let mut req = c_request("BREW", "https://example.test/coffee");
        let ptr = &mut req.raw as *mut CHttpRequest;

        let handle = unsafe { bridge_http_send(ptr, &client as *const FfiHttpClient as *mut c_void) };
        assert!(handle.is_null());
        assert_eq!(
            response_for(ptr).unwrap(),
            Err("invalid argument: unknown HTTP method BREW".to_string())
        );
        assert_eq!(client.counters().submitted, 0);
    }

    #[test]
    fn cancel_of_unknown_handle_is_harmless() {
        let client = client();
        unsafe {
            bridge_http_cancel(std::ptr::null_mut(), 12345 as *mut c_void, &client as *const FfiHttpClient as *mut c_void)
        };
        assert_eq!(client.counters().submitted, 0);
    }

    #[test]
    fn interior_nul_cannot_build_a_response() {
        assert!(OwnedResponse::build(&HttpResponse::error("bad\0message")).is_err());
    }
}
