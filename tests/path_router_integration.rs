mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{
    current_param, load_test_config, rejecting, resolving, settle, wait_for_url,
    DeferredAuthenticator,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use visor::adapters::{PathRouter, RouterAdapter};
use visor::auth::{AuthOutcome, Authenticator};
use visor::config::ConfigV1;
use visor::routing::{
    authenticated_only, not_for_authenticated, Restriction, RouteDescriptor,
};
use visor::{Visor, VisorError};

fn routes(visor: &Visor<Value>) -> PathRouter<Value> {
    PathRouter::new(visor.evaluator())
        .when_restricted("/private_url", authenticated_only())
        .when("/public")
        .when("/thingy")
        .when_restricted("/hidden", not_for_authenticated())
        .when("/login")
        .when("/access_denied")
}

fn guarded(
    config: &ConfigV1,
    authenticator: Arc<dyn Authenticator<Value>>,
) -> (Visor<Value>, Arc<PathRouter<Value>>) {
    let visor = Visor::new(config, authenticator).expect("valid config");
    let router = Arc::new(routes(&visor));
    visor.attach(router.clone()).expect("first router");
    (visor, router)
}

// -- Authentication policy

#[tokio::test]
async fn test_authenticate_is_called_on_startup_by_default() {
    let auth = DeferredAuthenticator::new();
    let _visor = Visor::new(&ConfigV1::default(), auth.clone()).unwrap();

    settle().await;

    assert_eq!(auth.calls(), 1);
}

#[tokio::test]
async fn test_route_started_before_authentication_done_does_not_authenticate_again() {
    let auth = DeferredAuthenticator::new();
    let visor = Visor::new(&ConfigV1::default(), auth.clone()).unwrap();
    settle().await;
    assert_eq!(auth.calls(), 1);

    let evaluator = visor.evaluator();
    let check = tokio::spawn(async move {
        let route = RouteDescriptor::restricted("/thingy", Restriction::new(|_| true));
        evaluator.on_route_change(&route).await
    });
    settle().await;
    assert_eq!(auth.calls(), 1);

    auth.resolve(json!({"username": "myName"}));
    check.await.unwrap();
    assert_eq!(auth.calls(), 1);
}

#[tokio::test]
async fn test_route_waits_for_startup_authentication() {
    let auth = DeferredAuthenticator::new();
    let (_visor, router) = guarded(&ConfigV1::default(), auth.clone());

    let navigation = {
        let router = router.clone();
        tokio::spawn(async move { router.navigate("/thingy").await })
    };
    settle().await;
    assert_eq!(router.current_url(), None);

    auth.resolve(Value::Null);

    assert_eq!(navigation.await.unwrap(), Ok("/thingy".to_string()));
    assert_eq!(router.current_url().as_deref(), Some("/thingy"));
}

#[tokio::test]
async fn test_lazy_mode_authenticates_on_first_restricted_route_only() {
    let auth = DeferredAuthenticator::new();
    let config = load_test_config("authenticate_on_startup: false\n");
    let (visor, router) = guarded(&config, auth.clone());

    router.navigate("/thingy").await.unwrap();
    assert_eq!(router.current_url().as_deref(), Some("/thingy"));
    assert_eq!(auth.calls(), 0);

    let evaluator = visor.evaluator();
    evaluator
        .on_route_change(&RouteDescriptor::public("/public"))
        .await;
    assert_eq!(auth.calls(), 0);

    let pending = tokio::spawn(async move {
        let route = RouteDescriptor::restricted("/private_url", Restriction::new(|_| false));
        evaluator.on_route_change(&route).await
    });
    settle().await;
    assert_eq!(auth.calls(), 1);
    assert!(!pending.is_finished());
}

#[tokio::test]
async fn test_authenticator_may_use_other_services() {
    struct AuthService {
        called: AtomicBool,
    }

    impl AuthService {
        async fn current_user(&self) -> Result<Value, String> {
            self.called.store(true, Ordering::SeqCst);
            Ok(json!("auth!"))
        }
    }

    let service = Arc::new(AuthService {
        called: AtomicBool::new(false),
    });
    let dependency = service.clone();
    let authenticator = move || {
        let dependency = dependency.clone();
        async move { dependency.current_user().await }
    };
    let (_visor, router) = guarded(&ConfigV1::default(), Arc::new(authenticator));

    router.navigate("/thingy").await.unwrap();

    assert!(service.called.load(Ordering::SeqCst));
}

// -- Redirects

#[tokio::test]
async fn test_logged_in_user_enters_private_route() {
    let (_visor, router) = guarded(
        &ConfigV1::default(),
        resolving(json!({"username": "myName"})),
    );

    let landed = router.navigate("/private_url").await.unwrap();

    assert_eq!(landed, "/private_url");
}

#[tokio::test]
async fn test_anonymous_user_is_sent_to_login_with_next() {
    let (_visor, router) = guarded(&ConfigV1::default(), rejecting("not authenticated"));

    router.navigate("/private_url").await.unwrap();

    assert_eq!(router.current_path().as_deref(), Some("/login"));
    assert_eq!(
        current_param(router.as_ref(), "next").as_deref(),
        Some("/private_url")
    );
}

#[tokio::test]
async fn test_anonymous_user_may_visit_public_route() {
    let (_visor, router) = guarded(&ConfigV1::default(), rejecting("not authenticated"));

    let landed = router.navigate("/public").await.unwrap();

    assert_eq!(landed, "/public");
}

#[tokio::test]
async fn test_private_route_resumes_after_authentication() {
    let (visor, router) = guarded(&ConfigV1::default(), rejecting("not authenticated"));

    router.navigate("/private_url").await.unwrap();
    assert_eq!(router.current_path().as_deref(), Some("/login"));
    assert!(!visor.is_authenticated());

    visor.set_authenticated(json!({"username": "some_name"}));

    wait_for_url(router.as_ref(), "/private_url").await;
    assert!(visor.is_authenticated());
    assert_eq!(visor.evaluator().pending(), None);
}

#[tokio::test]
async fn test_authenticated_but_unauthorized_user_is_denied() {
    let (_visor, router) = guarded(&ConfigV1::default(), resolving(json!(true)));

    let landed = router.navigate("/hidden").await.unwrap();

    assert_eq!(landed, "/access_denied");
    assert_eq!(current_param(router.as_ref(), "next"), None);
}

#[tokio::test]
async fn test_set_unauthenticated_forces_a_fresh_authentication() {
    let auth = DeferredAuthenticator::new();
    let (visor, router) = guarded(&ConfigV1::default(), auth.clone());
    auth.reject("not authenticated");

    router.navigate("/public").await.unwrap();
    visor.set_authenticated(json!({"username": "x"}));
    visor.set_unauthenticated();
    assert_eq!(visor.outcome(), None);

    router.navigate("/private_url").await.unwrap();

    assert_eq!(auth.calls(), 2);
    assert_eq!(router.current_path().as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_public_route_after_logout_does_not_authenticate_again() {
    let auth = DeferredAuthenticator::new();
    let (visor, router) = guarded(&ConfigV1::default(), auth.clone());
    auth.resolve(json!({"username": "x"}));

    router.navigate("/public").await.unwrap();
    visor.set_unauthenticated();
    let landed = router.navigate("/public").await.unwrap();

    assert_eq!(landed, "/public");
    assert_eq!(auth.calls(), 1);
    assert_eq!(visor.outcome(), None);
}

#[tokio::test]
async fn test_rejection_does_not_resume_pending_navigation() {
    let auth = DeferredAuthenticator::new();
    let (visor, router) = guarded(&ConfigV1::default(), auth.clone());
    auth.reject("not authenticated");

    router.navigate("/private_url").await.unwrap();
    assert_eq!(visor.evaluator().pending().as_deref(), Some("/private_url"));

    visor.set_unauthenticated();
    assert!(visor.evaluator().gate().start());
    settle().await;

    assert!(matches!(visor.outcome(), Some(AuthOutcome::Rejected(_))));
    assert_eq!(visor.evaluator().pending().as_deref(), Some("/private_url"));
    assert_eq!(router.current_path().as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_failing_restriction_is_reported_and_denied() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let visor = Visor::with_error_channel(
        &ConfigV1::default(),
        resolving(json!({"username": "x"})),
        tx,
    )
    .unwrap();
    let router = Arc::new(routes(&visor).when_restricted(
        "/reports",
        Restriction::fallible(|_| Err("role service unavailable".to_string())),
    ));

    let landed = router.navigate("/reports").await.unwrap();

    assert_eq!(landed, "/access_denied");
    assert_eq!(
        rx.recv().await,
        Some(VisorError::RestrictionFailed {
            path: "/reports".to_string(),
            reason: "role service unavailable".to_string(),
        })
    );
}

#[tokio::test]
async fn test_only_one_router_may_be_attached() {
    let (visor, router) = guarded(&ConfigV1::default(), resolving(json!(null)));

    let second = visor.attach(router);

    assert!(matches!(second, Err(VisorError::Config(_))));
}

#[tokio::test]
async fn test_malformed_login_route_fails_at_setup() {
    let config = ConfigV1 {
        login_route: "login?next=x".to_string(),
        ..ConfigV1::default()
    };

    let result = Visor::new(&config, resolving(json!(null)));

    assert!(matches!(
        result,
        Err(VisorError::MalformedDestination { .. })
    ));
}
