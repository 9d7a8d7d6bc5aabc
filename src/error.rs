//! Error taxonomy shared by the gate, the evaluator and the router adapters.

use thiserror::Error;

/// Everything that can go wrong (or be reported) while guarding navigation.
///
/// Authentication rejections and permission denials are normal outcomes and are
/// turned into redirects by the evaluator; they only appear here so they can be
/// logged uniformly. Configuration faults and failing restriction predicates are
/// the ones that actually propagate to the embedding application.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VisorError {
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    #[error("permission denied for '{0}'")]
    PermissionDenied(String),

    #[error("malformed destination '{route}': {reason}")]
    MalformedDestination { route: String, reason: String },

    #[error("restriction for '{path}' failed: {reason}")]
    RestrictionFailed { path: String, reason: String },

    #[error("no route matches '{0}'")]
    RouteNotFound(String),

    #[error("too many redirects while navigating to '{0}'")]
    RedirectLoop(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VisorError {
    pub(crate) fn malformed(route: &str, reason: impl Into<String>) -> Self {
        VisorError::MalformedDestination {
            route: route.to_string(),
            reason: reason.into(),
        }
    }
}
