use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

use super::recorder::TransitionRecorder;
use super::redirect::RedirectPlanner;
use super::restriction::RouteDescriptor;
use crate::auth::{AuthGate, AuthOutcome, AuthValue};
use crate::config::ConfigV1;
use crate::error::VisorError;

/// Why a navigation was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No usable identity; logging in may change the answer.
    NeedsLogin,
    /// Authenticated, and still not allowed.
    Forbidden,
}

impl DenialReason {
    pub fn to_error(self, url: &str) -> VisorError {
        match self {
            DenialReason::NeedsLogin => {
                VisorError::AuthenticationRejected(format!("login required for '{}'", url))
            }
            DenialReason::Forbidden => VisorError::PermissionDenied(url.to_string()),
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NeedsLogin => f.write_str("needs login"),
            DenialReason::Forbidden => f.write_str("forbidden"),
        }
    }
}

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<V> {
    /// Go ahead. Carries the identity the restriction was evaluated against.
    Allow(Option<V>),
    /// Navigate to `destination` instead.
    Redirect {
        reason: DenialReason,
        destination: String,
    },
}

/// Decides every navigation against the shared [`AuthGate`].
///
/// With `authenticate_on_startup` every navigation waits until the startup
/// authentication has settled. After that, and always in lazy mode, only
/// restricted routes trigger (and wait for) authentication, and unrestricted
/// ones go through with whatever outcome is current.
pub struct PermissionEvaluator<V: AuthValue> {
    gate: Arc<AuthGate<V>>,
    planner: RedirectPlanner,
    recorder: TransitionRecorder,
    authenticate_on_startup: bool,
    /// Set once the startup attempt has been seen settled.
    startup_settled: AtomicBool,
    errors: Option<UnboundedSender<VisorError>>,
}

impl<V: AuthValue> PermissionEvaluator<V> {
    pub fn new(gate: Arc<AuthGate<V>>, config: &ConfigV1) -> Result<Self, VisorError> {
        Ok(PermissionEvaluator {
            gate,
            planner: RedirectPlanner::new(config)?,
            recorder: TransitionRecorder::new(),
            authenticate_on_startup: config.authenticate_on_startup,
            startup_settled: AtomicBool::new(false),
            errors: None,
        })
    }

    /// Failing restriction predicates are reported here as well as logged.
    pub fn with_error_channel(mut self, errors: UnboundedSender<VisorError>) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Kick off startup authentication when the policy asks for it.
    pub fn activate(&self) {
        if self.authenticate_on_startup && self.gate.start() {
            debug!("Startup authentication triggered");
        }
    }

    pub async fn on_route_change(&self, route: &RouteDescriptor<V>) -> Decision<V> {
        let value = if route.restrict.is_some() || self.awaiting_startup() {
            let outcome = self.gate.ensure().await;
            if self.authenticate_on_startup {
                self.startup_settled.store(true, Ordering::Release);
            }
            outcome.value().cloned()
        } else {
            self.gate.current().and_then(|outcome| outcome.value().cloned())
        };

        let Some(restriction) = &route.restrict else {
            debug!("Allowing unrestricted navigation to '{}'", route.url);
            return Decision::Allow(value);
        };

        let reason = match restriction.check(value.as_ref()) {
            Ok(true) => {
                debug!("Allowing navigation to '{}'", route.url);
                return Decision::Allow(value);
            }
            Ok(false) if value.as_ref().is_some_and(AuthValue::is_authenticated) => {
                DenialReason::Forbidden
            }
            Ok(false) => DenialReason::NeedsLogin,
            Err(reason) => {
                self.report(VisorError::RestrictionFailed {
                    path: route.url.clone(),
                    reason,
                });
                DenialReason::Forbidden
            }
        };

        let destination = match reason {
            DenialReason::NeedsLogin => {
                self.recorder.record(&route.url);
                self.planner.login_redirect(&route.url)
            }
            DenialReason::Forbidden => self.planner.access_denied_redirect(),
        };
        warn!(
            "{}; redirecting to '{}'",
            reason.to_error(&route.url),
            destination
        );
        Decision::Redirect {
            reason,
            destination,
        }
    }

    /// Whether unrestricted navigations still have to wait for the startup attempt.
    fn awaiting_startup(&self) -> bool {
        if !self.authenticate_on_startup || self.startup_settled.load(Ordering::Acquire) {
            return false;
        }
        if self.gate.current().as_ref().is_some_and(AuthOutcome::is_settled) {
            self.startup_settled.store(true, Ordering::Release);
            return false;
        }
        true
    }

    /// The last target sent to login, cleared by this call.
    pub fn take_pending(&self) -> Option<String> {
        self.recorder.take()
    }

    pub fn pending(&self) -> Option<String> {
        self.recorder.pending()
    }

    pub fn gate(&self) -> &Arc<AuthGate<V>> {
        &self.gate
    }

    fn report(&self, err: VisorError) {
        error!("{}", err);
        if let Some(errors) = &self.errors {
            if errors.send(err).is_err() {
                debug!("Error channel closed; restriction failure only logged");
            }
        }
    }
}
