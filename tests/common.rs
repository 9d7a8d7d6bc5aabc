#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::Value;
use tokio::sync::watch;
use visor::adapters::RouterAdapter;
use visor::auth::Authenticator;
use visor::config::{Config, ConfigV1};
use visor::routing::Destination;

/// Authenticator that stays pending until the test settles it, counting calls.
pub struct DeferredAuthenticator {
    calls: AtomicUsize,
    result: watch::Sender<Option<Result<Value, String>>>,
}

impl DeferredAuthenticator {
    pub fn new() -> Arc<Self> {
        let (result, _) = watch::channel(None);
        Arc::new(DeferredAuthenticator {
            calls: AtomicUsize::new(0),
            result,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resolve(&self, value: Value) {
        self.result.send_replace(Some(Ok(value)));
    }

    pub fn reject(&self, reason: &str) {
        self.result.send_replace(Some(Err(reason.to_string())));
    }
}

#[async_trait]
impl Authenticator<Value> for DeferredAuthenticator {
    async fn authenticate(&self) -> Result<Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.result.subscribe();
        let settled = match rx.wait_for(Option::is_some).await {
            Ok(result) => result.clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| Err("authenticator dropped".to_string()))
    }
}

pub fn resolving(value: Value) -> Arc<dyn Authenticator<Value>> {
    Arc::new(move || {
        let value = value.clone();
        async move { Ok::<Value, String>(value) }
    })
}

pub fn rejecting(reason: &str) -> Arc<dyn Authenticator<Value>> {
    let reason = reason.to_string();
    Arc::new(move || {
        let reason = reason.clone();
        async move { Err::<Value, String>(reason) }
    })
}

/// Parse a test configuration; `extra` is appended to the version line.
pub fn load_test_config(extra: &str) -> ConfigV1 {
    let yaml = format!("version: \"1.0.0\"\n{}", extra);
    let config: Config = Figment::new()
        .merge(Yaml::string(&yaml))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

/// Give spawned tasks a chance to run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the router lands on `expected`, failing after two seconds.
pub async fn wait_for_url(router: &dyn RouterAdapter, expected: &str) {
    let reached = tokio::time::timeout(Duration::from_secs(2), async {
        while router.current_url().as_deref() != Some(expected) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(
        reached.is_ok(),
        "router never reached '{}', last url {:?}",
        expected,
        router.current_url()
    );
}

/// Decoded query parameter of the router's current URL.
pub fn current_param(router: &dyn RouterAdapter, name: &str) -> Option<String> {
    let url = router.current_url()?;
    Destination::parse(&url).ok()?.query_param(name)
}
