#![allow(clippy::unwrap_used)]
// Integration tests for `JenkinsClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use jenkinsfly_api::{Error, JenkinsClient, JenkinsVersion};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, JenkinsClient, Url) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = JenkinsClient::with_client(reqwest::Client::new());
    (server, client, base_url)
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

// ── Success ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_with_basic_auth() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .and(basic_auth("alice", "s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Jenkins", "2.440.1")
                .set_body_json(json!({ "url": server.uri(), "mode": "NORMAL" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let info = client
        .authenticate(&base_url, "alice", &secret("s3cret"), "", JenkinsVersion::Version2)
        .await
        .unwrap();

    assert_eq!(info.version.as_deref(), Some("2.440.1"));
    assert_eq!(info.url.as_deref(), Some(server.uri().as_str()));
}

#[tokio::test]
async fn test_anonymous_access_sends_no_credentials() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .and(|req: &Request| !req.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": null })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client
        .authenticate(&base_url, "  ", &secret(""), "", JenkinsVersion::Version1)
        .await
        .unwrap();

    assert_eq!(info.url, None);
    assert_eq!(info.version, None);
}

#[tokio::test]
async fn test_version1_crumb_header() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .and(header(".crumb", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .authenticate(&base_url, "", &secret(""), "abc123", JenkinsVersion::Version1)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_version2_crumb_header() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .and(header("Jenkins-Crumb", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .authenticate(&base_url, "", &secret(""), "abc123", JenkinsVersion::Version2)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_context_path_is_preserved() {
    let (server, client, _) = setup().await;
    let base_url = Url::parse(&format!("{}/jenkins", server.uri())).unwrap();

    Mock::given(method("GET"))
        .and(path("/jenkins/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .authenticate(&base_url, "", &secret(""), "", JenkinsVersion::Version2)
        .await
        .unwrap();
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_carries_body() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string("<html>Invalid password/token</html>"),
        )
        .mount(&server)
        .await;

    let err = client
        .authenticate(&base_url, "alice", &secret("wrong"), "", JenkinsVersion::Version2)
        .await
        .unwrap_err();

    assert!(err.is_authentication(), "expected Authentication, got: {err:?}");
    assert_eq!(err.to_string(), "Unauthorized (HTTP 401)");
    assert_eq!(err.response_body(), Some("<html>Invalid password/token</html>"));
}

#[tokio::test]
async fn test_forbidden_without_body() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client
        .authenticate(&base_url, "alice", &secret("pw"), "", JenkinsVersion::Version1)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Authentication { body: None, .. }),
        "expected Authentication without body, got: {err:?}"
    );
}

#[tokio::test]
async fn test_server_error_is_not_authentication() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client
        .authenticate(&base_url, "", &secret(""), "", JenkinsVersion::Version2)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Http { status: 503, .. }), "got: {err:?}");
    assert!(err.is_transient());
    assert_eq!(err.response_body(), None);
}

#[tokio::test]
async fn test_non_json_body_is_deserialization_error() {
    let (server, client, base_url) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let err = client
        .authenticate(&base_url, "", &secret(""), "", JenkinsVersion::Version2)
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Deserialization { ref body, .. } if body.contains("proxy login")),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let client = JenkinsClient::with_client(reqwest::Client::new());
    // Port 9 (discard) is closed on test machines.
    let base_url = Url::parse("http://127.0.0.1:9/").unwrap();

    let err = client
        .authenticate(&base_url, "", &secret(""), "", JenkinsVersion::Version2)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
}
