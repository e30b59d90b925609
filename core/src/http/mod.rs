//! http: asynchronous dispatch of native-originated HTTP requests.
//!
//! The native engine calls `submit`/`cancel` on its own threads; neither
//! ever performs network I/O. Workers run the blocking call and deliver
//! through a [`ResponseSink`] unless the request was canceled meanwhile.

pub mod dispatcher;
pub mod registry;
pub mod transport;
pub mod types;

pub use dispatcher::{RequestDispatcher, ResponseSink};
pub use registry::{PendingRequest, RequestRegistry};
pub use transport::{prepare_headers, HttpTransport, TransportError, TransportResponse};
pub use types::{HttpHeader, HttpMethod, HttpRequest, HttpResponse, RequestId};

#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
