use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use super::{follow_redirects, RouterAdapter};
use crate::auth::AuthValue;
use crate::error::VisorError;
use crate::routing::{Destination, PermissionEvaluator, Restriction, RouteDescriptor};

struct StateDef<V> {
    name: String,
    /// Path only, parent paths already prepended. Declared query parameters
    /// (`/diffLogin?name`) are accepted but not part of matching.
    url: String,
    /// Restrictions of every ancestor, then the state's own.
    restrictions: Vec<Restriction<V>>,
}

/// A router of named, nested states (`parent.child`).
///
/// A child's URL is appended to its parent's, and a child is only reachable
/// when every ancestor's restriction allows it too.
pub struct StateRouter<V: AuthValue> {
    evaluator: Arc<PermissionEvaluator<V>>,
    states: Vec<StateDef<V>>,
    current: Mutex<Option<String>>,
}

impl<V: AuthValue> StateRouter<V> {
    pub fn new(evaluator: Arc<PermissionEvaluator<V>>) -> Self {
        StateRouter {
            evaluator,
            states: Vec::new(),
            current: Mutex::new(None),
        }
    }

    pub fn state(self, name: &str, url: &str) -> Result<Self, VisorError> {
        self.register(name, url, None)
    }

    pub fn restricted_state(
        self,
        name: &str,
        url: &str,
        restrict: Restriction<V>,
    ) -> Result<Self, VisorError> {
        self.register(name, url, Some(restrict))
    }

    fn register(
        mut self,
        name: &str,
        url: &str,
        restrict: Option<Restriction<V>>,
    ) -> Result<Self, VisorError> {
        if self.find_by_name(name).is_some() {
            return Err(VisorError::Config(format!(
                "state '{}' is already registered",
                name
            )));
        }
        let (parent_url, mut restrictions) = match name.rsplit_once('.') {
            Some((parent, _)) => {
                let parent = self.find_by_name(parent).ok_or_else(|| {
                    VisorError::Config(format!(
                        "parent state '{}' of '{}' is not registered",
                        parent, name
                    ))
                })?;
                (parent.url.clone(), parent.restrictions.clone())
            }
            None => (String::new(), Vec::new()),
        };
        let declared = Destination::parse(url)?;
        restrictions.extend(restrict);
        self.states.push(StateDef {
            name: name.to_string(),
            url: format!("{}{}", parent_url, declared.path()),
            restrictions,
        });
        Ok(self)
    }

    /// Navigate to a state by name.
    pub async fn go(&self, name: &str) -> Result<String, VisorError> {
        let url = self
            .find_by_name(name)
            .map(|state| state.url.clone())
            .ok_or_else(|| VisorError::RouteNotFound(name.to_string()))?;
        self.navigate(&url).await
    }

    /// Name of the state the router is currently in.
    pub fn current_state(&self) -> Option<String> {
        let url = self.current_url()?;
        let destination = Destination::parse(&url).ok()?;
        self.find_by_path(destination.path())
            .map(|state| state.name.clone())
    }

    fn find_by_name(&self, name: &str) -> Option<&StateDef<V>> {
        self.states.iter().find(|state| state.name == name)
    }

    fn find_by_path(&self, path: &str) -> Option<&StateDef<V>> {
        self.states.iter().find(|state| state.url == path)
    }

    fn resolve(&self, destination: &Destination) -> Result<RouteDescriptor<V>, VisorError> {
        let state = self
            .find_by_path(destination.path())
            .ok_or_else(|| VisorError::RouteNotFound(destination.path().to_string()))?;
        let restrict = match state.restrictions.as_slice() {
            [] => None,
            [only] => Some(only.clone()),
            chain => Some(Restriction::all(chain.to_vec())),
        };
        Ok(RouteDescriptor {
            url: destination.to_string(),
            restrict,
        })
    }
}

#[async_trait]
impl<V: AuthValue> RouterAdapter for StateRouter<V> {
    async fn navigate(&self, url: &str) -> Result<String, VisorError> {
        let landed = follow_redirects(&*self.evaluator, url, |d| self.resolve(d)).await?;
        info!("Entered state for '{}'", landed);
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
