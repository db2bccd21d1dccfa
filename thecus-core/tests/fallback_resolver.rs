//! Endpoint fallback through the session client

use serde_json::json;
use thecus_core::{CheckError, EndpointQuery, Method, Resolved};
use thecus_devkit::{MockReply, TestHarness};

const A: &str = "/adm/getmain.php?fun=a";
const B: &str = "/adm/getmain.php?fun=b";
const C: &str = "/adm/getmain.php?fun=c";

fn query() -> EndpointQuery {
    EndpointQuery::new("test data", A).or(B).or(C)
}

#[tokio::test]
async fn undecodable_candidates_fall_through() {
    let harness = TestHarness::new();
    harness
        .transport
        .route(A, MockReply::text(""))
        .route(B, MockReply::text("<html>not json</html>"))
        .route_json(C, json!({"answer": 42}));

    let mut resolver = harness.resolver();
    let response = resolver.fetch(&query()).await.unwrap();

    assert_eq!(response.number("answer"), Some(42.0));
    assert_eq!(harness.transport.paths(), vec![A, B, C]);
}

#[tokio::test]
async fn first_success_short_circuits() {
    let harness = TestHarness::new();
    harness
        .transport
        .route(A, MockReply::status(500, "boom"))
        .route_json(B, json!({"from": "b"}))
        .route_json(C, json!({"from": "c"}));

    let mut resolver = harness.resolver();
    let resolved = resolver.resolve(&query()).await.unwrap();

    match resolved {
        Resolved::Single(response) => assert_eq!(response.text("from").as_deref(), Some("b")),
        other => panic!("expected a single answer, got {:?}", other),
    }
    harness.assert_requested(C, 0).unwrap();
}

#[tokio::test]
async fn all_client_errors_is_no_endpoint() {
    let harness = TestHarness::new();

    let mut resolver = harness.resolver();
    let err = resolver.fetch(&query()).await.unwrap_err();

    match err {
        CheckError::NoEndpointSatisfied { query, attempts } => {
            assert_eq!(query, "test data");
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(harness.transport.paths(), vec![A, B, C]);
}

#[tokio::test]
async fn authentication_failure_aborts_immediately() {
    let harness = TestHarness::new();
    harness
        .transport
        .route(A, MockReply::redirect(302, "/unauth.htm"))
        .route("/unauth.htm", MockReply::text("<html></html>"))
        .route_json(B, json!({"from": "b"}));

    let mut resolver = harness.resolver();
    let err = resolver.fetch(&query()).await.unwrap_err();

    assert!(matches!(err, CheckError::AuthenticationFailed(_)));
    harness.assert_requested(B, 0).unwrap();
    harness.assert_requested(C, 0).unwrap();
}

#[tokio::test]
async fn transport_failure_aborts_immediately() {
    let harness = TestHarness::new();
    harness
        .transport
        .route(A, MockReply::failure("timed out"))
        .route_json(B, json!({}));

    let mut resolver = harness.resolver();
    let err = resolver.fetch(&query()).await.unwrap_err();

    assert!(matches!(err, CheckError::Transport(_)));
    harness.assert_requested(B, 0).unwrap();
}

#[tokio::test]
async fn collect_all_keeps_every_success_in_order() {
    let harness = TestHarness::new();
    harness
        .transport
        .route_json(A, json!({"n": 1}))
        .route(B, MockReply::status(404, ""))
        .route_json(C, json!({"n": 3}));

    let mut resolver = harness.resolver();
    let responses = resolver.fetch_all(&query().collecting_all()).await.unwrap();

    let numbers: Vec<_> = responses.iter().map(|r| r.number("n")).collect();
    assert_eq!(numbers, vec![Some(1.0), Some(3.0)]);
}

#[tokio::test]
async fn relogin_happens_inside_a_candidate() {
    let harness = TestHarness::new();
    harness.accept_login();
    harness
        .transport
        .script(A, [MockReply::logged_out()])
        .route_json(A, json!({"n": 1}));

    let mut resolver = harness.resolver();
    let response = resolver.fetch(&query()).await.unwrap();

    assert_eq!(response.number("n"), Some(1.0));
    assert_eq!(resolver.source().login_attempts(), 1);
    harness.assert_requested(B, 0).unwrap();
}

#[tokio::test]
async fn query_without_auto_login_propagates_expiry() {
    let harness = TestHarness::new();
    harness.accept_login();
    harness.transport.route(A, MockReply::logged_out());

    let mut resolver = harness.resolver();
    let err = resolver
        .fetch(&query().without_auto_login())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckError::AuthorizationExpired));
    assert_eq!(resolver.into_inner().login_attempts(), 0);
}

#[tokio::test]
async fn post_body_reaches_every_candidate() {
    let harness = TestHarness::new();
    harness.transport.route_json(B, json!({}));

    let mut resolver = harness.resolver();
    resolver
        .fetch(&query().with_body("fun=x"))
        .await
        .unwrap();

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.method == Method::Post && r.body.as_deref() == Some("fun=x")));
}
