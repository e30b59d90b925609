use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::types::BridgeError;

/// Process-unique, strictly increasing request identifier.
pub type RequestId = u64;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = BridgeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(BridgeError::InvalidArgument(format!("unknown HTTP method {}", other))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Request descriptor as received from the native engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<HttpHeader>,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: Bytes::new() }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HttpHeader::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Response descriptor handed back to the native engine.
/// A transport failure carries only a message, never a status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpResponse {
    Ok {
        status_code: u16,
        headers: Vec<HttpHeader>,
        body: Bytes,
    },
    Error {
        message: String,
    },
}

impl HttpResponse {
    pub fn error(message: impl Into<String>) -> Self {
        HttpResponse::Error { message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, HttpResponse::Error { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpResponse::Ok { status_code, .. } => Some(*status_code),
            HttpResponse::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_methods() {
        for name in ["GET", "POST", "PATCH", "PUT", "DELETE"] {
            let method: HttpMethod = name.parse().unwrap();
            assert_eq!(method.as_str(), name);
        }
    }

    #[test]
    fn rejects_unknown_method() {
        let err = "TRACE".parse::<HttpMethod>().unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: unknown HTTP method TRACE");
    }

    #[test]
    fn error_response_has_no_status() {
        let resp = HttpResponse::error("ConnectionFailed: refused");
        assert!(resp.is_error());
        assert_eq!(resp.status_code(), None);
    }
}
