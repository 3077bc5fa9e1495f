//! Auth gate: hold protected content until a session check resolves.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthGate` is the reusable definition (checker, login path, navigator).
//! Each `mount` is one activation: it spawns exactly one check and returns a
//! `MountedGate` that renders `Loading`, the authorized children, or a
//! redirect. Rendering never re-triggers the check.
//!
//! DESIGN
//! ======
//! The spawned task owns the only path that writes `GateState`. The watch
//! sender sits behind a mutex shared with the `MountedGate`; teardown takes
//! it out, so once `unmount` returns no later publish or navigation can
//! happen. The cancellation token stops a pending retry delay right away and
//! the task handle is aborted so an in-flight request is dropped.
//!
//! ERROR HANDLING
//! ==============
//! Fail closed: exhausted retries resolve to `Unauthorized` exactly like a
//! 401, but are logged at `error` level so the two stay distinguishable.

pub mod context;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

pub use context::{AuthorizedField, FieldKey, IdentityContext};

use crate::config::DEFAULT_LOGIN_PATH;
use crate::session::{Identity, RetryingSessionChecker, SessionProbe, SessionVerdict};

/// Neutral placeholder shown while the check is in flight.
pub const LOADING_PLACEHOLDER: &str = "Loading...";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GateState {
    #[default]
    Loading,
    Authorized(Arc<Identity>),
    Unauthorized,
}

impl GateState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.is_loading()
    }
}

/// What a mounted gate shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView<T> {
    Loading,
    Authorized(T),
    Redirect { to: String },
}

/// Receives the redirect signal when a gate resolves to `Unauthorized`.
///
/// Called while the gate's publish slot is held, so `unmount` on another
/// thread waits for it to return. It must not unmount the same gate itself.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, to: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, to: &str) {
        self(to);
    }
}

type Publisher = Arc<Mutex<Option<watch::Sender<GateState>>>>;

// =============================================================================
// GATE DEFINITION
// =============================================================================

pub struct AuthGate<P> {
    checker: Arc<RetryingSessionChecker<P>>,
    login_path: Arc<str>,
    navigator: Arc<dyn Navigator>,
}

impl<P: SessionProbe + 'static> AuthGate<P> {
    /// Gate redirecting to `/login` with no navigator attached.
    #[must_use]
    pub fn new(checker: RetryingSessionChecker<P>) -> Self {
        Self {
            checker: Arc::new(checker),
            login_path: Arc::from(DEFAULT_LOGIN_PATH),
            navigator: Arc::new(|_: &str| {}),
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: &str) -> Self {
        self.login_path = Arc::from(login_path);
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Activate the gate and start its one session check.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn mount(&self) -> MountedGate {
        let id = Uuid::new_v4();
        let (tx, rx) = watch::channel(GateState::Loading);
        let publisher: Publisher = Arc::new(Mutex::new(Some(tx)));
        let cancel = CancellationToken::new();

        let span = info_span!("auth_gate", gate_id = %id);
        let task = tokio::spawn(
            run_check(
                Arc::clone(&self.checker),
                cancel.clone(),
                Arc::clone(&publisher),
                Arc::clone(&self.navigator),
                Arc::clone(&self.login_path),
            )
            .instrument(span),
        );

        MountedGate { id, state: rx, publisher, cancel, task, login_path: Arc::clone(&self.login_path) }
    }
}

async fn run_check<P: SessionProbe>(
    checker: Arc<RetryingSessionChecker<P>>,
    cancel: CancellationToken,
    publisher: Publisher,
    navigator: Arc<dyn Navigator>,
    login_path: Arc<str>,
) {
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("gate unmounted before session check resolved");
            return;
        }
        result = checker.check() => result,
    };

    let next = match result {
        Ok(SessionVerdict::Authenticated(identity)) => {
            info!(email = %identity.email, "session authorized");
            GateState::Authorized(Arc::new(identity))
        }
        Ok(SessionVerdict::Unauthenticated) => {
            info!("session not authenticated; redirecting");
            GateState::Unauthorized
        }
        Err(e) => {
            error!(code = e.error_code(), error = %e, "session check inconclusive; failing closed");
            GateState::Unauthorized
        }
    };
    let redirect = matches!(next, GateState::Unauthorized);

    // Teardown takes the sender under this lock; navigating before releasing
    // it keeps a redirect from landing after `unmount` has returned.
    let guard = publisher.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(tx) = guard.as_ref() else {
        debug!("gate unmounted; discarding session check result");
        return;
    };
    tx.send_replace(next);
    if redirect {
        navigator.navigate(&login_path);
    }
}

// =============================================================================
// MOUNTED GATE
// =============================================================================

/// One activation of an `AuthGate`. Dropping it unmounts.
pub struct MountedGate {
    id: Uuid,
    state: watch::Receiver<GateState>,
    publisher: Publisher,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    login_path: Arc<str>,
}

impl MountedGate {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    /// Watch receiver for state transitions of this mount.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state.clone()
    }

    /// Wait for the check to resolve. `None` if the gate was torn down first.
    pub async fn settled(&self) -> Option<GateState> {
        let mut rx = self.state.clone();
        match rx.wait_for(GateState::is_settled).await {
            Ok(state) => Some(GateState::clone(&state)),
            Err(_) => None,
        }
    }

    /// The published identity, or the empty sentinel before authorization.
    #[must_use]
    pub fn context(&self) -> IdentityContext {
        match self.state() {
            GateState::Authorized(identity) => IdentityContext::provide(identity),
            GateState::Loading | GateState::Unauthorized => IdentityContext::default(),
        }
    }

    /// Render the gate. `children` runs only when authorized.
    pub fn render<T, F>(&self, children: F) -> GateView<T>
    where
        F: FnOnce(&IdentityContext) -> T,
    {
        match self.state() {
            GateState::Loading => GateView::Loading,
            GateState::Authorized(identity) => GateView::Authorized(children(&IdentityContext::provide(identity))),
            GateState::Unauthorized => GateView::Redirect { to: self.login_path.to_string() },
        }
    }

    /// Deactivate: cancel any pending delay and discard a late result.
    pub fn unmount(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        self.cancel.cancel();
        self.task.abort();
        let sender = self.publisher.lock().unwrap_or_else(PoisonError::into_inner).take();
        if sender.is_some() && self.state.borrow().is_loading() {
            debug!(gate_id = %self.id, "gate unmounted while loading");
        }
    }
}

impl Drop for MountedGate {
    fn drop(&mut self) {
        self.teardown();
    }
}
