//! In-memory probe for driving the retry loop and the gate under paused time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::session::{Identity, ProbeError, ProbeOutcome, SessionProbe, TransientFailure};

#[derive(Debug, Clone)]
pub enum Step {
    Outcome(ProbeOutcome),
    TransportError,
}

impl Step {
    pub fn ok(email: &str) -> Self {
        Self::Outcome(ProbeOutcome::Authenticated(Identity::new(email)))
    }

    pub fn unauthorized() -> Self {
        Self::Outcome(ProbeOutcome::Unauthenticated)
    }

    pub fn status(code: u16) -> Self {
        Self::Outcome(ProbeOutcome::Transient(TransientFailure::Status(code)))
    }
}

/// Plays `script` in order, then repeats `fallback` forever.
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    latency: Duration,
    calls: Arc<AtomicU32>,
    in_flight: Arc<AtomicU32>,
    max_in_flight: Arc<AtomicU32>,
}

impl ScriptedProbe {
    pub fn new(script: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicU32::new(0)),
            in_flight: Arc::new(AtomicU32::new(0)),
            max_in_flight: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new(Vec::new(), step)
    }

    /// Simulated round-trip time per probe.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn max_in_flight(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.max_in_flight)
    }

    pub fn in_flight(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.in_flight)
    }
}

/// Decrements the in-flight count even when the request future is dropped.
struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionProbe for ScriptedProbe {
    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Outcome(outcome) => Ok(outcome),
            Step::TransportError => Err(ProbeError::Transport("connection refused".to_owned())),
        }
    }
}

pub fn call_count(calls: &AtomicU32) -> u32 {
    calls.load(Ordering::SeqCst)
}

// =============================================================================
// LOG CAPTURE
// =============================================================================

/// Formatted `tracing` output collected for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's `tracing` events into the capture until the guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (capture, tracing::subscriber::set_default(subscriber))
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
