use http::Extensions;
use reqwest::{Client, Request, Response, StatusCode};
use reqwest_attempt::reqwest_middleware::{ClientBuilder, Middleware, Next, Result};
use reqwest_attempt::{Context, PreparedRequest, RequestDescription};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

use crate::helpers::{refused_uri, RecoveringResponder};

/// Counts the attempts that reach the transport.
#[derive(Clone, Default)]
struct CountingMiddleware(Arc<AtomicU32>);

#[async_trait::async_trait]
impl Middleware for CountingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        self.0.fetch_add(1, Ordering::SeqCst);
        next.run(req, extensions).await
    }
}

#[tokio::test]
async fn do_once_runs_through_middleware() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let counter = CountingMiddleware::default();
    let client = ClientBuilder::new(Client::new())
        .with(counter.clone())
        .build();
    let desc = RequestDescription::new("DELETE", server.uri()).status_codes([200, 204]);
    let req = desc.build().unwrap();

    let err = desc.do_once(&req, &client).await.unwrap_err();

    assert_eq!(err.to_string(), "error constraint with status code: 404");
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn do_retriable_reuses_the_prepared_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(RecoveringResponder::new(2, 500))
        .expect(3)
        .mount(&server)
        .await;

    let counter = CountingMiddleware::default();
    let client = ClientBuilder::new(Client::new())
        .with(counter.clone())
        .build();
    let desc = RequestDescription::new("POST", server.uri())
        .body("same every time")
        .attempts(4)
        .status_codes([200]);
    let req = desc.build().unwrap();

    let resp = desc.do_retriable(&req, &client).await.expect("call failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    for request in server.received_requests().await.unwrap() {
        assert_eq!(request.body, b"same every time");
    }
}

#[tokio::test]
async fn do_retriable_keeps_zero_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let client = ClientBuilder::new(Client::new()).build();
    let desc = RequestDescription::new("GET", server.uri())
        .attempts(3)
        .backoff_ms(0)
        .status_codes([200]);
    let req = desc.build().unwrap();

    let started = Instant::now();
    let err = desc.do_retriable(&req, &client).await.unwrap_err();

    assert!(err.is_status());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn prepared_request_from_raw_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let raw = Client::new().get(server.uri()).build().unwrap();
    let req = PreparedRequest::new(raw, Context::background());
    let client = ClientBuilder::new(Client::new()).build();

    let resp = RequestDescription::default()
        .do_once(&req, &client)
        .await
        .expect("call failed");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn cancelled_context_aborts_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let ctx = Context::background();
    let desc = RequestDescription::new("GET", server.uri()).context(ctx.clone());
    let req = desc.build().unwrap();
    let client = ClientBuilder::new(Client::new()).build();

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = desc.do_once(&req, &client).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.is_transport());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn do_retriable_retries_transport_errors_up_to_bound() {
    let counter = CountingMiddleware::default();
    let client = ClientBuilder::new(Client::new())
        .with(counter.clone())
        .build();
    let desc = RequestDescription::new("GET", refused_uri())
        .attempts(2)
        .backoff_ms(10);
    let req = desc.build().unwrap();

    let started = Instant::now();
    let err = desc.do_retriable(&req, &client).await.unwrap_err();

    assert!(matches!(err, reqwest_attempt::Error::Transport(_)));
    assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(2 * 10));
}

#[tokio::test]
async fn streaming_body_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let chunks = futures::stream::iter(vec![Ok::<_, std::io::Error>(b"chunk".to_vec())]);
    let raw = Client::new()
        .post(server.uri())
        .body(reqwest::Body::wrap_stream(chunks))
        .build()
        .unwrap();
    let req = PreparedRequest::new(raw, Context::background());
    let counter = CountingMiddleware::default();
    let client = ClientBuilder::new(Client::new())
        .with(counter.clone())
        .build();

    let err = RequestDescription::default()
        .do_once(&req, &client)
        .await
        .unwrap_err();

    assert!(err.is_build());
    assert!(err.to_string().contains("not clonable"));
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}
