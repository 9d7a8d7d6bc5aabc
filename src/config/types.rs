use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::error::VisorError;
use crate::routing::Destination;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: authentication policy, redirect destinations and logging.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ConfigV1 {
    /// Run `authenticate()` once when the gate is created and hold every
    /// navigation until it settles. When false, only restricted routes trigger it.
    #[serde(default = "default_true")]
    pub authenticate_on_startup: bool,
    /// Append the originally requested URL to the login destination.
    #[serde(default = "default_true")]
    pub should_add_next: bool,
    #[serde(default = "default_next_parameter_name")]
    pub next_parameter_name: String,
    /// Where anonymous users are sent. May carry its own query and fragment.
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Where authenticated but unauthorized users are sent.
    #[serde(default = "default_access_denied_route")]
    pub access_denied_route: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ConfigV1 {
    fn default() -> Self {
        ConfigV1 {
            authenticate_on_startup: true,
            should_add_next: true,
            next_parameter_name: default_next_parameter_name(),
            login_route: default_login_route(),
            access_denied_route: default_access_denied_route(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ConfigV1 {
    /// Checks everything that would otherwise only fail on the first redirect.
    pub fn validate(&self) -> Result<(), VisorError> {
        if self.next_parameter_name.trim().is_empty() {
            return Err(VisorError::Config(
                "next_parameter_name must not be empty".to_string(),
            ));
        }
        Destination::parse(&self.login_route)?;
        Destination::parse(&self.access_denied_route)?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_next_parameter_name() -> String {
    "next".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

fn default_access_denied_route() -> String {
    "/access_denied".to_string()
}

/// Load config from a YAML file, letting `VISOR_*` environment variables override
/// fields. Nested fields use `__`, e.g. `VISOR_LOGGING__LEVEL=debug`.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, VisorError> {
    extract(
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("VISOR_").split("__")),
    )
}

/// Load config from an in-memory YAML document.
pub fn load_config_str(yaml: &str) -> Result<ConfigV1, VisorError> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, VisorError> {
    let config = figment
        .extract::<Config>()
        .map_err(|e| VisorError::Config(e.to_string()))?;
    let config = match config {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), VisorError> {
    let schema = schema_for!(Config);
    let rendered =
        serde_json::to_string_pretty(&schema).map_err(|e| VisorError::Config(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
