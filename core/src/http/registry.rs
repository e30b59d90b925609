//! Registry of in-flight requests, shared by submitters, cancelers and workers.
//!
//! One mutex guards both id allocation and the running table. Delivery runs
//! while that mutex is held, so once `cancel` returns no delivery for the id
//! can be in progress or still to come.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::constants::FIRST_REQUEST_ID;
use crate::utils::lock_unpoisoned;

use super::types::{HttpRequest, RequestId};

/// A registered request plus the caller's opaque completion token.
pub struct PendingRequest<T> {
    pub id: RequestId,
    pub request: HttpRequest,
    pub token: T,
}

struct RegistryState<T> {
    next_id: RequestId,
    running: HashMap<RequestId, PendingRequest<T>>,
}

pub struct RequestRegistry<T> {
    inner: Mutex<RegistryState<T>>,
}

impl<T> Default for RequestRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState { next_id: FIRST_REQUEST_ID, running: HashMap::new() }),
        }
    }

    /// Assign the next id and mark the request running.
    pub fn register(&self, request: HttpRequest, token: T) -> RequestId {
        let mut state = lock_unpoisoned(&self.inner);
        let id = state.next_id;
        state.next_id += 1;
        state.running.insert(id, PendingRequest { id, request, token });
        id
    }

    /// Returns `true` if the id was still running. Unknown or finished ids are a no-op.
    pub fn cancel(&self, id: RequestId) -> bool {
        lock_unpoisoned(&self.inner).running.remove(&id).is_some()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        lock_unpoisoned(&self.inner).running.contains_key(&id)
    }

    /// Clone of the request, if still running.
    pub fn request(&self, id: RequestId) -> Option<HttpRequest> {
        lock_unpoisoned(&self.inner).running.get(&id).map(|p| p.request.clone())
    }

    /// Remove the request and, unless it was canceled, run `deliver` on it.
    ///
    /// The removal decides delivery; `deliver` runs after the lock is
    /// released, so it may call back into `register` or `cancel`.
    pub fn complete_if_not_canceled<R, F>(&self, id: RequestId, deliver: F) -> Option<R>
    where
        F: FnOnce(PendingRequest<T>) -> R,
    {
        let pending = lock_unpoisoned(&self.inner).running.remove(&id)?;
        Some(deliver(pending))
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.inner).running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::types::HttpMethod;

    fn req() -> HttpRequest {
        HttpRequest::new(HttpMethod::Get, "https://example.invalid/")
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let reg = RequestRegistry::new();
        assert_eq!(reg.register(req(), ()), 1);
        assert_eq!(reg.register(req(), ()), 2);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn canceled_request_is_not_completed() {
        let reg = RequestRegistry::new();
        let id = reg.register(req(), "token");
        assert!(reg.cancel(id));
        assert!(!reg.cancel(id));
        assert_eq!(reg.complete_if_not_canceled(id, |p| p.token), None);
    }

    #[test]
    fn delivery_may_reenter_the_registry() {
        let reg = RequestRegistry::new();
        let first = reg.register(req(), 1u32);
        let followup = reg.complete_if_not_canceled(first, |_| reg.register(req(), 2u32));
        let followup = followup.unwrap();
        assert!(reg.is_pending(followup));
        assert_eq!(reg.complete_if_not_canceled(followup, |p| reg.cancel(p.id)), Some(false));
        assert!(reg.is_empty());
    }

    #[test]
    fn completion_happens_once() {
        let reg = RequestRegistry::new();
        let id = reg.register(req(), 7u32);
        assert_eq!(reg.complete_if_not_canceled(id, |p| p.token), Some(7));
        assert_eq!(reg.complete_if_not_canceled(id, |p| p.token), None);
        assert!(!reg.cancel(id));
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_id_cancel_is_noop() {
        let reg: RequestRegistry<()> = RequestRegistry::new();
        assert!(!reg.cancel(42));
    }
}
