//! Blocking HTTP client seam used by dispatcher workers.

use thiserror::Error;

use crate::config::ClientIdentity;
use crate::constants::headers;

use super::types::{HttpHeader, HttpRequest};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub headers: Vec<HttpHeader>,
    pub body: bytes::Bytes,
}

/// Failure to obtain any HTTP response at all.
/// Non-2xx statuses are responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused or rejected by a proxy. Prefixed so the native
    /// side can tell it apart from a server-side 5xx.
    #[error("ConnectionFailed: {0}")]
    ConnectionFailed(String),

    #[error("{0}")]
    Failed(String),
}

/// A blocking HTTP client. Called from pool workers only.
pub trait HttpTransport: Send + Sync + 'static {
    fn send(&self, request: &HttpRequest) -> Result<TransportResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    fn send(&self, request: &HttpRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request)
    }
}

/// Merge duplicate names (case-insensitive) into one comma-separated value,
/// keeping first-seen order and spelling, then force the identity headers.
pub fn prepare_headers(input: &[HttpHeader], identity: &ClientIdentity) -> Vec<HttpHeader> {
    let mut merged: Vec<HttpHeader> = Vec::with_capacity(input.len() + 2);

    for header in input {
        match merged.iter_mut().find(|h| h.name.eq_ignore_ascii_case(&header.name)) {
            Some(existing) => {
                existing.value.push_str(", ");
                existing.value.push_str(&header.value);
            }
            None => merged.push(header.clone()),
        }
    }

    set_header(&mut merged, headers::SDK_TYPE, &identity.sdk_type);
    set_header(&mut merged, headers::SDK_VERSION, &identity.sdk_version);
    merged
}

fn set_header(list: &mut Vec<HttpHeader>, name: &str, value: &str) {
    list.retain(|h| !h.name.eq_ignore_ascii_case(name));
    list.push(HttpHeader::new(name, value));
}

// -----------------------------------------------------------------------------
// reqwest
// -----------------------------------------------------------------------------

#[cfg(feature = "reqwest-transport")]
pub use self::reqwest_impl::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_impl {
    use super::*;

    /// Blocking transport over `reqwest`.
    pub struct ReqwestTransport {
        client: reqwest::blocking::Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self, TransportError> {
            let client = reqwest::blocking::Client::builder()
                .build()
                .map_err(|e| TransportError::Failed(e.to_string()))?;
            Ok(Self { client })
        }

        pub fn with_client(client: reqwest::blocking::Client) -> Self {
            Self { client }
        }
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else {
            TransportError::Failed(e.to_string())
        }
    }

    impl HttpTransport for ReqwestTransport {
        fn send(&self, request: &HttpRequest) -> Result<TransportResponse, TransportError> {
            let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
                .map_err(|e| TransportError::Failed(e.to_string()))?;

            let mut builder = self.client.request(method, request.url.as_str());
            for header in &request.headers {
                builder = builder.header(header.name.as_str(), header.value.as_str());
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body.to_vec());
            }

            let response = builder.send().map_err(map_error)?;
            let status_code = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    HttpHeader::new(name.as_str(), String::from_utf8_lossy(value.as_bytes()))
                })
                .collect();
            let body = response.bytes().map_err(map_error)?;

            Ok(TransportResponse { status_code, headers, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ClientIdentity {
        ClientIdentity { sdk_type: "sdk-test".into(), sdk_version: "9.9.9".into() }
    }

    #[test]
    fn merges_duplicate_names_case_insensitively() {
        let input = vec![
            HttpHeader::new("Accept", "a"),
            HttpHeader::new("X-Other", "x"),
            HttpHeader::new("accept", "b"),
        ];
        let out = prepare_headers(&input, &identity());
        assert_eq!(out[0], HttpHeader::new("Accept", "a, b"));
        assert_eq!(out[1], HttpHeader::new("X-Other", "x"));
    }

    #[test]
    fn identity_headers_overwrite_native_ones() {
        let input = vec![
            HttpHeader::new("x-tanker-sdktype", "native"),
            HttpHeader::new("X-Tanker-SdkVersion", "0.0.1"),
        ];
        let out = prepare_headers(&input, &identity());
        assert_eq!(
            out,
            vec![
                HttpHeader::new(headers::SDK_TYPE, "sdk-test"),
                HttpHeader::new(headers::SDK_VERSION, "9.9.9"),
            ]
        );
    }

    #[test]
    fn connection_failure_message_is_prefixed() {
        let err = TransportError::ConnectionFailed("proxy said no".into());
        assert_eq!(err.to_string(), "ConnectionFailed: proxy said no");
    }
}
