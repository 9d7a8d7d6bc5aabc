//! Router integrations. Each adapter intercepts navigations, asks the
//! [`PermissionEvaluator`] about them and performs whatever it decides.

pub mod path_router;
pub mod state_router;

pub use path_router::PathRouter;
pub use state_router::StateRouter;

use async_trait::async_trait;
use tracing::debug;

use crate::auth::AuthValue;
use crate::error::VisorError;
use crate::routing::{Decision, Destination, PermissionEvaluator, RouteDescriptor};

/// Redirect chains longer than this are treated as a loop.
pub const MAX_REDIRECTS: usize = 10;

/// The narrow surface the rest of the crate needs from a router.
#[async_trait]
pub trait RouterAdapter: Send + Sync {
    /// Attempt to navigate to `url`, following any redirects the evaluator
    /// issues. Returns the URL the router ended up on.
    async fn navigate(&self, url: &str) -> Result<String, VisorError>;

    /// The URL of the last completed navigation, if any.
    fn current_url(&self) -> Option<String>;
}

/// Runs `url` through the evaluator, following redirects until a navigation
/// is allowed. `resolve` maps a parsed URL onto the router's route table.
pub(crate) async fn follow_redirects<V, F>(
    evaluator: &PermissionEvaluator<V>,
    url: &str,
    resolve: F,
) -> Result<String, VisorError>
where
    V: AuthValue,
    F: Fn(&Destination) -> Result<RouteDescriptor<V>, VisorError>,
{
    let mut target = url.to_string();
    for _ in 0..=MAX_REDIRECTS {
        let destination = Destination::parse(&target)?;
        let route = resolve(&destination)?;
        match evaluator.on_route_change(&route).await {
            Decision::Allow(_) => return Ok(target),
            Decision::Redirect {
                reason,
                destination,
            } => {
                debug!("Following {} redirect '{}' -> '{}'", reason, target, destination);
                target = destination;
            }
        }
    }
    Err(VisorError::RedirectLoop(url.to_string()))
}
