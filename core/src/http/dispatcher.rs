//! RequestDispatcher: `submit`/`cancel` entry points for the native engine.
//!
//! Exactly-once rule: every submitted id gets one delivery, unless a
//! `cancel` for it returned first, in which case it gets none.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::{BridgeConfig, ClientIdentity};
use crate::scheduler::SharedWorkerPool;
use crate::telemetry::{DispatchCounters, DispatchSnapshot};
use crate::utils::panic_message;

use super::registry::{PendingRequest, RequestRegistry};
use super::transport::{prepare_headers, HttpTransport};
use super::types::{HttpRequest, HttpResponse, RequestId};

/// Receives final responses. In production this forwards to the native
/// `http_handle_response` entry point.
///
/// `deliver` runs with no dispatcher lock held and may submit or cancel
/// requests on the same dispatcher.
pub trait ResponseSink: Send + Sync + 'static {
    /// Opaque per-request handle, e.g. the native request pointer.
    type Token: Send + 'static;

    fn deliver(&self, token: Self::Token, response: HttpResponse);
}

struct DispatchShared<T: HttpTransport, S: ResponseSink> {
    registry: RequestRegistry<S::Token>,
    transport: T,
    sink: S,
    identity: ClientIdentity,
    counters: DispatchCounters,
}

pub struct RequestDispatcher<T: HttpTransport, S: ResponseSink> {
    shared: Arc<DispatchShared<T, S>>,
    pool: Arc<SharedWorkerPool>,
}

impl<T: HttpTransport, S: ResponseSink> RequestDispatcher<T, S> {
    pub fn new(transport: T, sink: S, pool: Arc<SharedWorkerPool>, config: &BridgeConfig) -> Self {
        Self {
            shared: Arc::new(DispatchShared {
                registry: RequestRegistry::new(),
                transport,
                sink,
                identity: config.identity(),
                counters: DispatchCounters::default(),
            }),
            pool,
        }
    }

    /// Register and enqueue. Returns at once with the new id; never does I/O.
    pub fn submit(&self, request: HttpRequest, token: S::Token) -> RequestId {
        let id = self.shared.registry.register(request, token);
        self.shared.counters.record_submitted();
        tracing::debug!(request_id = id, "http request submitted");

        let shared = Arc::clone(&self.shared);
        if let Err(e) = self.pool.push(move || shared.process(id)) {
            tracing::error!(request_id = id, error = %e, "could not enqueue http request");
            self.shared.complete(id, HttpResponse::error(e.to_string()));
        }
        id
    }

    /// After this returns the id will not be delivered. Unknown and
    /// already-finished ids are ignored.
    pub fn cancel(&self, id: RequestId) -> bool {
        let removed = self.shared.registry.cancel(id);
        tracing::debug!(request_id = id, removed, "http request cancel");
        removed
    }

    /// Requests submitted and not yet delivered or canceled.
    pub fn pending(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn counters(&self) -> DispatchSnapshot {
        self.shared.counters.snapshot()
    }
}

impl<T: HttpTransport, S: ResponseSink> DispatchShared<T, S> {
    // ---- worker side ----
    fn process(&self, id: RequestId) {
        let Some(mut request) = self.registry.request(id) else {
            self.counters.record_skipped();
            tracing::debug!(request_id = id, "canceled before start, skipping");
            return;
        };
        request.headers = prepare_headers(&request.headers, &self.identity);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.transport.send(&request)));
        let response = match outcome {
            Ok(Ok(resp)) => HttpResponse::Ok {
                status_code: resp.status_code,
                headers: resp.headers,
                body: resp.body,
            },
            Ok(Err(e)) => {
                self.counters.record_transport_failure();
                tracing::warn!(request_id = id, url = %request.url, error = %e, "http transport failed");
                HttpResponse::error(e.to_string())
            }
            Err(payload) => {
                self.counters.record_transport_failure();
                let msg = panic_message(payload.as_ref());
                tracing::error!(request_id = id, reason = %msg, "http transport panicked");
                HttpResponse::error(msg)
            }
        };

        self.complete(id, response);
    }

    fn complete(&self, id: RequestId, response: HttpResponse) {
        let delivered = self
            .registry
            .complete_if_not_canceled(id, |pending| self.deliver_or_abort(pending, response));
        if delivered.is_none() {
            self.counters.record_discarded();
            tracing::debug!(request_id = id, "canceled while running, response discarded");
        }
    }

    // A failure here would leave the native engine waiting forever.
    fn deliver_or_abort(&self, pending: PendingRequest<S::Token>, response: HttpResponse) {
        let PendingRequest { id, token, .. } = pending;
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.sink.deliver(token, response)));
        match result {
            Ok(()) => {
                self.counters.record_delivered();
                tracing::debug!(request_id = id, "http response delivered");
            }
            Err(payload) => {
                tracing::error!(
                    request_id = id,
                    reason = %panic_message(payload.as_ref()),
                    "fatal error delivering http response"
                );
                std::process::abort();
            }
        }
    }
}
