use std::fmt;
use std::sync::Arc;

use crate::auth::AuthValue;

type Check<V> = dyn Fn(Option<&V>) -> Result<bool, String> + Send + Sync;

/// A per-route predicate over the current identity.
///
/// The predicate receives the resolved identity, or `None` when
/// authentication was rejected. An `Err` means the predicate itself failed.
pub struct Restriction<V> {
    check: Arc<Check<V>>,
}

impl<V> Clone for Restriction<V> {
    fn clone(&self) -> Self {
        Restriction {
            check: self.check.clone(),
        }
    }
}

impl<V> fmt::Debug for Restriction<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Restriction(..)")
    }
}

impl<V: AuthValue> Restriction<V> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(Option<&V>) -> bool + Send + Sync + 'static,
    {
        Restriction {
            check: Arc::new(move |value: Option<&V>| -> Result<bool, String> {
                Ok(predicate(value))
            }),
        }
    }

    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(Option<&V>) -> Result<bool, String> + Send + Sync + 'static,
    {
        Restriction {
            check: Arc::new(predicate),
        }
    }

    /// Allows only if every restriction allows. Stops at the first refusal or failure.
    pub fn all(restrictions: Vec<Restriction<V>>) -> Self {
        Restriction::fallible(move |value| {
            for restriction in &restrictions {
                if !restriction.check(value)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    pub fn check(&self, value: Option<&V>) -> Result<bool, String> {
        (self.check)(value)
    }
}

/// Only users with a truthy identity get through.
pub fn authenticated_only<V: AuthValue>() -> Restriction<V> {
    Restriction::new(|value: Option<&V>| value.is_some_and(AuthValue::is_authenticated))
}

/// Only anonymous users get through (login and sign-up pages).
pub fn not_for_authenticated<V: AuthValue>() -> Restriction<V> {
    Restriction::new(|value: Option<&V>| !value.is_some_and(AuthValue::is_authenticated))
}

/// The route a navigation is heading to: its full URL and, optionally, the
/// restriction guarding it.
///
/// A route without a restriction never triggers authentication on its own.
#[derive(Debug, Clone)]
pub struct RouteDescriptor<V> {
    pub url: String,
    pub restrict: Option<Restriction<V>>,
}

impl<V> RouteDescriptor<V> {
    pub fn public(url: impl Into<String>) -> Self {
        RouteDescriptor {
            url: url.into(),
            restrict: None,
        }
    }

    pub fn restricted(url: impl Into<String>, restrict: Restriction<V>) -> Self {
        RouteDescriptor {
            url: url.into(),
            restrict: Some(restrict),
        }
    }
}
