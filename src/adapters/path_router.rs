use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use super::{follow_redirects, RouterAdapter};
use crate::auth::AuthValue;
use crate::error::VisorError;
use crate::routing::{Destination, PermissionEvaluator, Restriction, RouteDescriptor};

/// A flat router: each path maps to at most one restriction.
pub struct PathRouter<V: AuthValue> {
    evaluator: Arc<PermissionEvaluator<V>>,
    routes: HashMap<String, Option<Restriction<V>>>,
    current: Mutex<Option<String>>,
}

impl<V: AuthValue> PathRouter<V> {
    pub fn new(evaluator: Arc<PermissionEvaluator<V>>) -> Self {
        PathRouter {
            evaluator,
            routes: HashMap::new(),
            current: Mutex::new(None),
        }
    }

    /// Register a path anyone may visit.
    pub fn when(mut self, path: &str) -> Self {
        self.routes.insert(path.to_string(), None);
        self
    }

    /// Register a path guarded by `restrict`.
    pub fn when_restricted(mut self, path: &str, restrict: Restriction<V>) -> Self {
        self.routes.insert(path.to_string(), Some(restrict));
        self
    }

    /// Path of the current route, without query or fragment.
    pub fn current_path(&self) -> Option<String> {
        let url = self.current_url()?;
        Destination::parse(&url).ok().map(|d| d.path().to_string())
    }

    fn resolve(&self, destination: &Destination) -> Result<RouteDescriptor<V>, VisorError> {
        let restrict = self
            .routes
            .get(destination.path())
            .ok_or_else(|| VisorError::RouteNotFound(destination.path().to_string()))?;
        Ok(RouteDescriptor {
            url: destination.to_string(),
            restrict: restrict.clone(),
        })
    }
}

#[async_trait]
impl<V: AuthValue> RouterAdapter for PathRouter<V> {
    async fn navigate(&self, url: &str) -> Result<String, VisorError> {
        let landed = follow_redirects(&*self.evaluator, url, |d| self.resolve(d)).await?;
        info!("Navigated to '{}'", landed);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(landed.clone());
        Ok(landed)
    }

    fn current_url(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
