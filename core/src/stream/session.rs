//! StreamSession: the state and the one lock shared by both bridge halves.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::BridgeError;
use crate::utils::lock_unpoisoned;

use super::io::HostSource;
use super::native::NativeStream;

/// Guarded by the session lock. `closed` never goes back to `false`.
pub(crate) struct SessionState {
    pub(crate) closed: bool,
    /// `None` while a read is running on the reader thread.
    pub(crate) source: Option<Box<dyn HostSource>>,
    pub(crate) native: Option<Box<dyn NativeStream>>,
    pub(crate) error: Option<BridgeError>,
}

impl SessionState {
    /// First error wins; later ones are logged and dropped.
    pub(crate) fn record_error(&mut self, error: BridgeError) {
        if let Some(first) = &self.error {
            tracing::debug!(first = %first, dropped = %error, "stream error already recorded");
            return;
        }
        self.error = Some(error);
    }
}

#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<Mutex<SessionState>>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    /// A session with no input source (output-only adaptation).
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_source(source: Box<dyn HostSource>) -> Self {
        Self::build(Some(source))
    }

    fn build(source: Option<Box<dyn HostSource>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState { closed: false, source, native: None, error: None })),
        }
    }

    /// Not re-entrant: never call while already holding it.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_unpoisoned(&self.inner)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Has a native handle installed and not yet torn down.
    pub fn has_native(&self) -> bool {
        self.lock().native.is_some()
    }

    /// Take the recorded error, so it surfaces exactly once.
    pub fn take_error(&self) -> Option<BridgeError> {
        self.lock().error.take()
    }

    pub fn install_native(&self, native: Box<dyn NativeStream>) -> Result<(), BridgeError> {
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::Programming("native stream installed on a closed session"));
        }
        if state.native.is_some() {
            return Err(BridgeError::Programming("native stream already installed"));
        }
        state.native = Some(native);
        Ok(())
    }
}
