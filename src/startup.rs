//! Wiring the gate, the evaluator and a router into one running guard.
//!
//! [`Visor`] is created once per application. It triggers startup
//! authentication when configured to, and once a router is attached it
//! resumes the last navigation that was sent to login whenever an
//! authentication attempt resolves or the user is marked as logged in.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::adapters::RouterAdapter;
use crate::auth::{AuthGate, AuthOutcome, AuthValue, Authenticator};
use crate::config::ConfigV1;
use crate::error::VisorError;
use crate::routing::PermissionEvaluator;

pub struct Visor<V: AuthValue> {
    gate: Arc<AuthGate<V>>,
    evaluator: Arc<PermissionEvaluator<V>>,
    resume: Mutex<Option<JoinHandle<()>>>,
}

impl<V: AuthValue> Visor<V> {
    /// Validates the configuration and, in startup mode, starts authenticating.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDestination` or `Config` if the login or access-denied
    /// routes cannot be used.
    pub fn new(
        config: &ConfigV1,
        authenticator: Arc<dyn Authenticator<V>>,
    ) -> Result<Self, VisorError> {
        Self::build(config, authenticator, None)
    }

    /// Like [`Visor::new`], additionally reporting failing restriction
    /// predicates on `errors`.
    pub fn with_error_channel(
        config: &ConfigV1,
        authenticator: Arc<dyn Authenticator<V>>,
        errors: UnboundedSender<VisorError>,
    ) -> Result<Self, VisorError> {
        Self::build(config, authenticator, Some(errors))
    }

    fn build(
        config: &ConfigV1,
        authenticator: Arc<dyn Authenticator<V>>,
        errors: Option<UnboundedSender<VisorError>>,
    ) -> Result<Self, VisorError> {
        let gate = Arc::new(AuthGate::new(authenticator));
        let mut evaluator = PermissionEvaluator::new(gate.clone(), config)?;
        if let Some(errors) = errors {
            evaluator = evaluator.with_error_channel(errors);
        }
        evaluator.activate();

        info!(
            "Route guard ready (authenticate_on_startup={}, login='{}', access_denied='{}')",
            config.authenticate_on_startup, config.login_route, config.access_denied_route
        );
        Ok(Visor {
            gate,
            evaluator: Arc::new(evaluator),
            resume: Mutex::new(None),
        })
    }

    /// The evaluator routers should consult on every navigation.
    pub fn evaluator(&self) -> Arc<PermissionEvaluator<V>> {
        self.evaluator.clone()
    }

    /// Subscribe `router` to authentication changes so a navigation that was
    /// sent to login is retried automatically. Only one router may be attached.
    pub fn attach(&self, router: Arc<dyn RouterAdapter>) -> Result<(), VisorError> {
        let mut resume = self.resume.lock().unwrap_or_else(PoisonError::into_inner);
        if resume.is_some() {
            return Err(VisorError::Config(
                "a router is already attached".to_string(),
            ));
        }

        let mut watcher = self.gate.watch();
        let evaluator = self.evaluator.clone();
        *resume = Some(tokio::spawn(async move {
            while let Some(outcome) = watcher.changed().await {
                // A rejection cannot turn a login redirect into an allowed navigation.
                if !matches!(outcome, AuthOutcome::Resolved(_)) {
                    continue;
                }
                let Some(target) = evaluator.take_pending() else {
                    continue;
                };
                info!("Authentication changed; resuming navigation to '{}'", target);
                match router.navigate(&target).await {
                    Ok(landed) => debug!("Resumed navigation landed on '{}'", landed),
                    Err(e) => error!("Resuming navigation to '{}' failed: {}", target, e),
                }
            }
        }));
        Ok(())
    }

    /// Mark the user as logged in, e.g. after a login form succeeded.
    pub fn set_authenticated(&self, value: V) {
        self.gate.force(value);
    }

    /// Forget the current identity; the next guarded navigation authenticates again.
    pub fn set_unauthenticated(&self) {
        self.gate.invalidate();
    }

    pub fn is_authenticated(&self) -> bool {
        self.gate
            .current()
            .is_some_and(|outcome| outcome.is_authenticated())
    }

    pub fn outcome(&self) -> Option<AuthOutcome<V>> {
        self.gate.current()
    }
}

impl<V: AuthValue> Drop for Visor<V> {
    fn drop(&mut self) {
        if let Some(task) = self
            .resume
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
