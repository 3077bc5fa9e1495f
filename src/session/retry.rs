//! Bounded retry around a `SessionProbe`.
//!
//! DESIGN
//! ======
//! One `RetryState` is created per call to `check` and carried through every
//! attempt of that check, so the bound holds: with `max_attempts = n` the
//! probe runs at most `n + 1` times. Attempts are strictly sequential; the
//! next probe starts only after the previous one settled and the delay
//! elapsed.
//!
//! ERROR HANDLING
//! ==============
//! 200 and 401 end the check immediately. Everything else is transient.
//! Running out of attempts is `CheckError::RetriesExhausted`, never a
//! silent `Unauthenticated`.

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

use std::time::Duration;

use tracing::{debug, warn};

use super::Identity;
use super::probe::{ProbeOutcome, SessionProbe, TransientFailure};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

// =============================================================================
// POLICY
// =============================================================================

/// Delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(n-1)` before retry `n`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, backoff: Backoff::Fixed(delay) }
    }

    /// Worst-case total delay before the check gives up.
    #[must_use]
    pub fn worst_case_delay(&self) -> Duration {
        (1..=self.max_attempts).map(|n| self.backoff.delay(n)).sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_RETRY_DELAY_MS))
    }
}

/// Attempt counter for one logical check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempts_made: u32,
    probes: u32,
    policy: RetryPolicy,
}

impl RetryState {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { attempts_made: 0, probes: 0, policy }
    }

    /// Transient failures recorded so far. Never decreases.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    /// Probe invocations started so far in this check.
    #[must_use]
    pub fn probes(&self) -> u32 {
        self.probes
    }

    /// Record that a probe is about to run.
    pub fn begin_attempt(&mut self) {
        self.probes = self.probes.saturating_add(1);
    }

    /// Record a transient failure. Returns the delay before the next attempt,
    /// or `None` once the bound is exceeded. Counter overflow counts as exceeded.
    pub fn record_transient(&mut self) -> Option<Duration> {
        self.attempts_made = self.attempts_made.checked_add(1)?;
        if self.attempts_made > self.policy.max_attempts {
            None
        } else {
            Some(self.policy.backoff.delay(self.attempts_made))
        }
    }
}

// =============================================================================
// CHECKER
// =============================================================================

/// Definitive answer of a completed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
    Authenticated(Identity),
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// Every allowed attempt failed transiently.
    #[error("session check gave up after {probes} attempts: {last}")]
    RetriesExhausted { probes: u32, last: TransientFailure },
}

impl CheckError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RetriesExhausted { .. } => "E_RETRIES_EXHAUSTED",
        }
    }
}

pub struct RetryingSessionChecker<P> {
    probe: P,
    policy: RetryPolicy,
}

impl<P: SessionProbe> RetryingSessionChecker<P> {
    #[must_use]
    pub fn new(probe: P, policy: RetryPolicy) -> Self {
        Self { probe, policy }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    #[must_use]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Run one logical check to a verdict.
    ///
    /// # Errors
    ///
    /// Returns `CheckError::RetriesExhausted` after `max_attempts + 1`
    /// transient failures in a row.
    pub async fn check(&self) -> Result<SessionVerdict, CheckError> {
        let mut state = RetryState::new(self.policy);
        loop {
            state.begin_attempt();
            let failure = match self.probe.probe().await {
                Ok(ProbeOutcome::Authenticated(identity)) => {
                    debug!(probes = state.probes(), "session check authenticated");
                    return Ok(SessionVerdict::Authenticated(identity));
                }
                Ok(ProbeOutcome::Unauthenticated) => {
                    debug!(probes = state.probes(), "session check rejected");
                    return Ok(SessionVerdict::Unauthenticated);
                }
                Ok(ProbeOutcome::Transient(failure)) => failure,
                Err(e) => TransientFailure::Transport(e.to_string()),
            };

            let Some(delay) = state.record_transient() else {
                return Err(CheckError::RetriesExhausted { probes: state.probes(), last: failure });
            };

            warn!(
                attempt = state.attempts_made(),
                max_attempts = self.policy.max_attempts,
                code = failure.code(),
                error = %failure,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "session check failed transiently; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
