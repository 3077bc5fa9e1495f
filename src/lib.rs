//! Client-side session-authentication gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! A gate probes the session-check endpoint (with bounded retries) before
//! showing protected content, then either exposes the resolved identity to
//! everything rendered inside it or signals a redirect to the login page.
//! `session` holds the network side, `gate` the UI state machine, and
//! `config` the environment-driven settings shared by both.

pub mod config;
pub mod gate;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, GateConfig, ProbeTimeouts};
pub use gate::{AuthGate, AuthorizedField, FieldKey, GateState, GateView, IdentityContext, MountedGate, Navigator};
pub use session::{
    Backoff, CheckError, HttpSessionProbe, Identity, ProbeError, ProbeOutcome, RetryPolicy, RetryState,
    RetryingSessionChecker, SessionProbe, SessionVerdict, TransientFailure,
};
