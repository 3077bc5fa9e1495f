//! Session checking: one probe against the session-check endpoint, wrapped
//! in a bounded retry loop.
//!
//! SYSTEM CONTEXT
//! ==============
//! `probe` performs a single round trip and classifies it. `retry` owns the
//! attempt counter for one logical check and decides between retrying,
//! returning a verdict, and giving up. The gate in `crate::gate` consumes
//! the checker's result and never talks to the network directly.

pub mod probe;
pub mod retry;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

pub use probe::{HttpSessionProbe, ProbeError, ProbeOutcome, SessionProbe, TransientFailure};
pub use retry::{Backoff, CheckError, RetryPolicy, RetryState, RetryingSessionChecker, SessionVerdict};

/// Minimal authenticated-user record.
///
/// The empty-email value (`Identity::default()`) is the unauthenticated
/// sentinel seen by readers outside an authorized gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into() }
    }

    /// True for the unauthenticated sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_empty()
    }
}
