use std::time::Duration;

use pipecheck_common::HarnessConfig;
use pipecheck_e2e::api::{Expectation, PROTECTED_PATH, UNMAPPED_PATH};
use pipecheck_e2e::{ApiChecker, HealthCheck, Suite, TestRunner};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

async fn healthy_site() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Rhombus AI</title>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .mount(&server)
        .await;
    // The redirect target must never be requested
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(UNMAPPED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn checker(server: &MockServer) -> ApiChecker {
    ApiChecker::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_default_checks_pass_against_healthy_site() {
    let server = healthy_site().await;
    let results = checker(&server)
        .run_all(&HealthCheck::defaults("rhombus"))
        .await;

    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(result.passed, "{}: {}", result.name, result.detail);
    }
    assert_eq!(results[1].status, Some(302));
}

#[tokio::test]
async fn test_home_page_redirect_is_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/en"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Rhombus"))
        .expect(1)
        .mount(&server)
        .await;

    let result = checker(&server).run(&HealthCheck::defaults("rhombus")[0]).await;
    assert!(result.passed, "{}", result.detail);
    assert_eq!(result.status, Some(200));
}

#[tokio::test]
async fn test_protected_route_may_answer_with_branded_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome to RHOMBUS"))
        .mount(&server)
        .await;

    let check = &HealthCheck::defaults("rhombus")[1];
    let result = checker(&server).run(check).await;
    assert!(result.passed, "{}", result.detail);
}

#[tokio::test]
async fn test_unbranded_200_fails_protected_route() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("parked domain"))
        .mount(&server)
        .await;

    let check = &HealthCheck::defaults("rhombus")[1];
    let result = checker(&server).run(check).await;
    assert!(!result.passed);
    assert_eq!(result.status, Some(200));
}

#[tokio::test]
async fn test_unmapped_route_answering_200_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let check = HealthCheck::new(
        "unknown endpoint returns 404",
        UNMAPPED_PATH,
        Expectation::Status { status: 404 },
    );
    let result = checker(&server).run(&check).await;
    assert!(!result.passed);
    assert!(result.detail.contains("expected status 404, got 200"), "{}", result.detail);
}

#[tokio::test]
async fn test_unreachable_host_is_a_failed_check() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let checker = ApiChecker::new(&uri, Duration::from_secs(2)).unwrap();
    let result = checker.run(&HealthCheck::defaults("rhombus")[0]).await;

    assert!(!result.passed);
    assert_eq!(result.status, None);
    assert!(result.detail.starts_with("request failed"), "{}", result.detail);
}

#[tokio::test]
async fn test_runner_reports_api_suite() {
    let server = healthy_site().await;
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        base_url: server.uri(),
        results_dir: dir.path().to_path_buf(),
        ..Default::default()
    };

    let runner = TestRunner::new(config);
    let result = runner.run(&[Suite::Api]).await;

    assert!(result.success());
    assert_eq!(result.passed, 1);
    assert_eq!(result.results[0].details.as_array().unwrap().len(), 3);
}
