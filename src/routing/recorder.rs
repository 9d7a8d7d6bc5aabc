use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// Remembers the most recent navigation that was sent to the login page, so it
/// can be resumed once the authentication outcome changes.
#[derive(Debug, Default)]
pub struct TransitionRecorder {
    pending: Mutex<Option<String>>,
}

impl TransitionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `url`, replacing whatever was pending before.
    pub fn record(&self, url: &str) {
        debug!("Recording '{}' for resumption after login", url);
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(url.to_string());
    }

    /// Take the pending target, leaving nothing behind.
    pub fn take(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn pending(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
