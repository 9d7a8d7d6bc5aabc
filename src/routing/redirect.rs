use crate::config::ConfigV1;
use crate::error::VisorError;

use super::destination::Destination;

/// Computes where denied navigations go. Destinations are parsed once, when
/// the planner is built, so a bad route fails at setup.
#[derive(Debug, Clone)]
pub struct RedirectPlanner {
    login: Destination,
    access_denied: Destination,
    should_add_next: bool,
    next_parameter_name: String,
}

impl RedirectPlanner {
    pub fn new(config: &ConfigV1) -> Result<Self, VisorError> {
        config.validate()?;
        Ok(RedirectPlanner {
            login: Destination::parse(&config.login_route)?,
            access_denied: Destination::parse(&config.access_denied_route)?,
            should_add_next: config.should_add_next,
            next_parameter_name: config.next_parameter_name.clone(),
        })
    }

    /// Login destination, carrying `original_url` in the next parameter when enabled.
    pub fn login_redirect(&self, original_url: &str) -> String {
        with_next(
            &self.login,
            original_url,
            self.should_add_next,
            &self.next_parameter_name,
        )
    }

    /// Access-denied destination, exactly as configured.
    pub fn access_denied_redirect(&self) -> String {
        self.access_denied.to_string()
    }
}

/// Merge `original_url` into `destination_route` under the configured next
/// parameter, overriding any value the route already carries for it.
/// With `should_add_next` off the route comes back unchanged.
pub fn build_redirect(
    destination_route: &str,
    original_url: &str,
    config: &ConfigV1,
) -> Result<String, VisorError> {
    let destination = Destination::parse(destination_route)?;
    Ok(with_next(
        &destination,
        original_url,
        config.should_add_next,
        &config.next_parameter_name,
    ))
}

fn with_next(
    destination: &Destination,
    original_url: &str,
    should_add_next: bool,
    next_parameter_name: &str,
) -> String {
    if !should_add_next {
        return destination.to_string();
    }
    let mut destination = destination.clone();
    destination.set_query_param(next_parameter_name, original_url);
    destination.to_string()
}
