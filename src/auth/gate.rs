use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::outcome::{AuthOutcome, AuthValue};

/// The application's way of finding out who the user is.
///
/// Called with no arguments; any services it needs are captured by the
/// implementor. Each call must settle exactly once.
#[async_trait]
pub trait Authenticator<V>: Send + Sync {
    async fn authenticate(&self) -> Result<V, String>;
}

/// Plain async closures work as authenticators.
#[async_trait]
impl<V, F, Fut> Authenticator<V> for F
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, String>> + Send + 'static,
{
    async fn authenticate(&self) -> Result<V, String> {
        (self)().await
    }
}

#[derive(Debug)]
struct Slot<V> {
    /// Bumped by every new attempt, `force` and `invalidate`; a settlement
    /// only lands if its attempt is still the current one.
    epoch: u64,
    /// `None` until the first attempt and again after `invalidate`.
    outcome: Option<AuthOutcome<V>>,
}

/// Memoizes a single authentication attempt and broadcasts every change of
/// the current [`AuthOutcome`].
pub struct AuthGate<V: AuthValue> {
    authenticator: Arc<dyn Authenticator<V>>,
    state: Arc<watch::Sender<Slot<V>>>,
}

impl<V: AuthValue> AuthGate<V> {
    pub fn new(authenticator: Arc<dyn Authenticator<V>>) -> Self {
        let (state, _) = watch::channel(Slot {
            epoch: 0,
            outcome: None,
        });
        AuthGate {
            authenticator,
            state: Arc::new(state),
        }
    }

    /// Starts an authentication attempt unless an outcome (settled or pending)
    /// already exists. Returns whether a new attempt was started.
    ///
    /// The attempt runs on a spawned task, so this must be called from within
    /// a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut started = None;
        self.state.send_if_modified(|slot| {
            if slot.outcome.is_some() {
                return false;
            }
            slot.epoch += 1;
            slot.outcome = Some(AuthOutcome::Pending);
            started = Some(slot.epoch);
            true
        });
        let Some(epoch) = started else {
            return false;
        };

        info!("Starting authentication attempt {}", epoch);
        let authenticator = self.authenticator.clone();
        let state = self.state.clone();
        tokio::spawn(async move {
            let attempt = tokio::spawn(async move { authenticator.authenticate().await });
            let outcome = match attempt.await {
                Ok(Ok(value)) => AuthOutcome::Resolved(value),
                Ok(Err(reason)) => AuthOutcome::Rejected(reason),
                // A panicking authenticator must not leave the slot pending forever.
                Err(e) => {
                    error!("Authentication attempt {} aborted: {}", epoch, e);
                    AuthOutcome::Rejected(format!("authenticator failed: {}", e))
                }
            };
            settle(&state, epoch, outcome);
        });
        true
    }

    /// Returns the current settled outcome, starting and awaiting an
    /// authentication attempt first if there is none. Concurrent callers all
    /// attach to the same attempt.
    pub async fn ensure(&self) -> AuthOutcome<V> {
        let mut rx = self.state.subscribe();
        loop {
            self.start();
            let outcome = match rx
                .wait_for(|slot| slot.outcome.as_ref().map_or(true, AuthOutcome::is_settled))
                .await
            {
                Ok(slot) => slot.outcome.clone(),
                // The sender lives as long as `self`, so this is unreachable in practice.
                Err(_) => return AuthOutcome::Rejected("authentication gate closed".to_string()),
            };
            // `None` means the outcome was invalidated while we waited; try again.
            if let Some(outcome) = outcome {
                return outcome;
            }
        }
    }

    /// Replaces the current outcome with `Resolved(value)`. An attempt still in
    /// flight is superseded and its eventual settlement is ignored.
    pub fn force(&self, value: V) {
        self.state.send_modify(|slot| {
            slot.epoch += 1;
            slot.outcome = Some(AuthOutcome::Resolved(value));
        });
        info!("Authentication outcome forced");
    }

    /// Forgets the current outcome so the next `ensure` authenticates again.
    pub fn invalidate(&self) {
        self.state.send_modify(|slot| {
            slot.epoch += 1;
            slot.outcome = None;
        });
        info!("Authentication outcome invalidated");
    }

    /// The current outcome without waiting or triggering anything.
    pub fn current(&self) -> Option<AuthOutcome<V>> {
        self.state.borrow().outcome.clone()
    }

    /// Subscribe to outcome changes made after this call.
    pub fn watch(&self) -> OutcomeWatcher<V> {
        OutcomeWatcher {
            rx: self.state.subscribe(),
        }
    }
}

fn settle<V>(state: &watch::Sender<Slot<V>>, epoch: u64, outcome: AuthOutcome<V>) {
    let label = match &outcome {
        AuthOutcome::Resolved(_) => "resolved".to_string(),
        AuthOutcome::Rejected(reason) => format!("rejected ({})", reason),
        AuthOutcome::Pending => "pending".to_string(),
    };
    let applied = state.send_if_modified(|slot| {
        if slot.epoch != epoch || !matches!(slot.outcome, Some(AuthOutcome::Pending)) {
            return false;
        }
        slot.outcome = Some(outcome);
        true
    });
    if applied {
        info!("Authentication attempt {} {}", epoch, label);
    } else {
        debug!(
            "Ignoring settlement of superseded authentication attempt {}",
            epoch
        );
    }
}

/// Receives the outcome every time it changes. Invalidations are skipped.
pub struct OutcomeWatcher<V> {
    rx: watch::Receiver<Slot<V>>,
}

impl<V: Clone> OutcomeWatcher<V> {
    /// Waits for the next change; `None` once the gate has been dropped.
    pub async fn changed(&mut self) -> Option<AuthOutcome<V>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(outcome) = self.rx.borrow_and_update().outcome.clone() {
                return Some(outcome);
            }
        }
    }
}
