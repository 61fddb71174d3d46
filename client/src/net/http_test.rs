use std::sync::Mutex;

use serde_json::{Value, json};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::*;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, Option<u16>, u64)>>,
}

impl ResponseInterceptor for Recorder {
    fn on_error(&self, ctx: &RequestContext, status: Option<u16>) {
        self.seen
            .lock()
            .expect("recorder lock")
            .push((ctx.path.clone(), status, ctx.generation));
    }
}

fn recorder(client: &HttpClient) -> Arc<Recorder> {
    let rec = Arc::new(Recorder::default());
    client.register(rec.clone());
    rec
}

#[test]
fn new_rejects_bad_base_urls() {
    assert!(matches!(HttpClient::new("not a url"), Err(ClientError::InvalidBaseUrl(_))));
    assert!(matches!(HttpClient::new("ftp://example.com"), Err(ClientError::InvalidBaseUrl(_))));
}

#[test]
fn new_strips_trailing_slash() {
    let client = HttpClient::new("http://localhost:5000/").expect("client");
    assert_eq!(client.base_url(), "http://localhost:5000");
    assert_eq!(client.url("/api/user"), "http://localhost:5000/api/user");
    assert_eq!(client.url("api/user"), "http://localhost:5000/api/user");
}

#[tokio::test]
async fn get_attaches_current_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    client.header().sync(Some("tok-1"));
    let body: Value = client.get("/api/user").await.expect("get");
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn anonymous_request_omits_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"ok": true}))
            }
        })
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    client.header().sync(Some("old"));
    let body: Value = client
        .send(Method::POST, "/api/login", Some(&json!({})), RequestOptions::anonymous())
        .await
        .expect("login");
    assert_eq!(body["ok"], true);
    assert!(client.header().is_set(), "per-request strip leaves the shared header alone");
}

#[tokio::test]
async fn error_status_carries_server_message_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token has expired"})))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let rec = recorder(&client);
    client.header().sync(Some("tok"));

    let err = client.get::<Value>("/api/user").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.server_message(), Some("Token has expired"));
    assert_eq!(*rec.seen.lock().expect("lock"), vec![("/api/user".to_owned(), Some(401), 0)]);
}

#[tokio::test]
async fn non_json_error_body_has_no_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let err = client.get::<Value>("/api/user").await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.server_message().is_none());
}

#[tokio::test]
async fn transport_failure_notifies_without_status() {
    let client = HttpClient::new("http://127.0.0.1:1").expect("client");
    let rec = recorder(&client);
    let err = client.get::<Value>("/api/user").await.unwrap_err();
    assert!(err.is_network());
    assert_eq!(rec.seen.lock().expect("lock")[0].1, None);
}

#[tokio::test]
async fn decode_failure_does_not_notify() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let rec = recorder(&client);
    let err = client.get::<Value>("/api/user").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert!(rec.seen.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn requests_are_stamped_with_login_generation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let rec = recorder(&client);
    client.epoch().advance();
    client.epoch().advance();
    let _ = client.get::<Value>("/api/chat/history").await;
    assert_eq!(rec.seen.lock().expect("lock")[0].2, 2);
}

#[tokio::test]
async fn cancelled_request_returns_cancelled_and_skips_interceptors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let rec = recorder(&client);
    let cancel = CancellationToken::new();
    let opts = RequestOptions::default().with_cancel(Some(cancel.clone()));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.send::<(), Value>(Method::GET, "/api/user", None, opts).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let result = pending.await.expect("join");
    assert!(matches!(result, Err(ClientError::Cancelled)));
    assert!(rec.seen.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn already_cancelled_token_short_circuits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpClient::new(&server.uri()).expect("client");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = client
        .send::<(), Value>(Method::GET, "/api/user", None, RequestOptions::default().with_cancel(Some(cancel)))
        .await;
    assert!(matches!(result, Err(ClientError::Cancelled)));
}
