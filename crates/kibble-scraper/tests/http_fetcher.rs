//! Integration tests for `HttpFetcher::fetch` against a local `wiremock`
//! server. No real network traffic is made.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kibble_core::RotationMode;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use kibble_scraper::{
    FetchCause, FetchOptions, FetcherConfig, HttpFetcher, ProxyConfig, ProxyProvider,
    UserAgentPool,
};

const PAGE: &str = "<html><body><h1>Adult Kibble 2kg</h1></body></html>";

fn agents() -> UserAgentPool {
    UserAgentPool::new(
        vec!["kibble-test/agent-a".to_owned(), "kibble-test/agent-b".to_owned()],
        RotationMode::RoundRobin,
    )
    .unwrap()
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(
        FetcherConfig {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            ..FetcherConfig::default()
        },
        agents(),
    )
    .unwrap()
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

async fn mount_page(server: &MockServer, at: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Identity and headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotates_user_agent_per_call() {
    let server = MockServer::start().await;
    mount_page(&server, "/dogs", 200, PAGE).await;
    let fetcher = fetcher();
    let url = format!("{}/dogs", server.uri());

    for _ in 0..3 {
        fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    }

    let requests = server.received_requests().await.unwrap();
    let seen: Vec<&str> = requests
        .iter()
        .filter_map(|r| header_value(r, "user-agent"))
        .collect();
    assert_eq!(
        seen,
        vec!["kibble-test/agent-a", "kibble-test/agent-b", "kibble-test/agent-a"]
    );
}

#[tokio::test]
async fn sends_browser_navigation_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cats"))
        .and(header_exists("accept"))
        .and(header_exists("accept-language"))
        .and(header("sec-fetch-mode", "navigate"))
        .and(header("sec-fetch-dest", "document"))
        .and(header("upgrade-insecure-requests", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let body = fetcher()
        .fetch(&format!("{}/cats", server.uri()), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(body, PAGE);
}

#[tokio::test]
async fn header_layers_apply_in_precedence_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/layers", 200, PAGE).await;
    let fetcher = HttpFetcher::new(
        FetcherConfig {
            default_headers: vec![
                ("Accept-Language".to_owned(), "fr-FR".to_owned()),
                ("X-Config".to_owned(), "config".to_owned()),
                ("X-Shared".to_owned(), "config".to_owned()),
            ],
            ..FetcherConfig::default()
        },
        agents(),
    )
    .unwrap();
    let options = FetchOptions {
        retailer_headers: vec![
            ("x-shared".to_owned(), "retailer".to_owned()),
            ("Referer".to_owned(), "https://shop.test/".to_owned()),
        ],
        ..FetchOptions::default()
    }
    .header("Accept-Language", "en-GB")
    .header("User-Agent", "kibble-test/override");

    fetcher
        .fetch(&format!("{}/layers", server.uri()), &options)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert_eq!(header_value(request, "accept-language"), Some("en-GB"));
    assert_eq!(header_value(request, "x-config"), Some("config"));
    assert_eq!(header_value(request, "x-shared"), Some("retailer"));
    assert_eq!(header_value(request, "referer"), Some("https://shop.test/"));
    assert_eq!(header_value(request, "user-agent"), Some("kibble-test/override"));
}

// ---------------------------------------------------------------------------
// Status handling and diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn strict_mode_rejects_non_success_status() {
    let server = MockServer::start().await;
    mount_page(&server, "/gone", 404, "not here").await;
    let fetcher = fetcher();
    let url = format!("{}/gone", server.uri());

    let err = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_transient());
    assert_eq!(err.url, url);

    let diagnostics = fetcher.last_response().unwrap();
    assert_eq!(diagnostics.status, 404);
    assert_eq!(diagnostics.requested_url, url);
}

#[tokio::test]
async fn lenient_mode_returns_error_page_body() {
    let server = MockServer::start().await;
    mount_page(&server, "/gone", 404, "not here").await;
    let fetcher = fetcher();

    let body = fetcher
        .fetch(&format!("{}/gone", server.uri()), &FetchOptions::default().lenient())
        .await
        .unwrap();
    assert_eq!(body, "not here");
    assert_eq!(fetcher.last_status(), Some(404));
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start().await;
    mount_page(&server, "/busy", 503, "try later").await;

    let err = fetcher()
        .fetch(&format!("{}/busy", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}

#[tokio::test]
async fn challenge_page_is_blocked() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/guarded",
        200,
        "<html><title>Just a moment...</title><p>Please enable cookies.</p></html>",
    )
    .await;

    let err = fetcher()
        .fetch(&format!("{}/guarded", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, FetchCause::Blocked));
    assert!(err.is_transient());
}

#[tokio::test]
async fn last_response_records_headers_and_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/diag"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-cache", "HIT")
                .set_body_string(PAGE),
        )
        .mount(&server)
        .await;
    let fetcher = fetcher();
    assert!(fetcher.last_response().is_none());

    fetcher
        .fetch(&format!("{}/diag", server.uri()), &FetchOptions::default())
        .await
        .unwrap();

    let diagnostics = fetcher.last_response().unwrap();
    assert_eq!(diagnostics.status, 200);
    assert!(diagnostics
        .headers
        .iter()
        .any(|(k, v)| k == "x-cache" && v == "HIT"));
    assert_eq!(diagnostics.user_agent, "kibble-test/agent-a");
    assert!(diagnostics.proxy.is_none());
}

// ---------------------------------------------------------------------------
// Redirects
// ---------------------------------------------------------------------------

/// Mounts `/hop/1` → `/hop/2` → … → `/hop/{hops}` → `/landing`.
async fn mount_redirect_chain(server: &MockServer, hops: usize) {
    for i in 1..=hops {
        let next = if i == hops {
            "/landing".to_owned()
        } else {
            format!("/hop/{}", i + 1)
        };
        Mock::given(method("GET"))
            .and(path(format!("/hop/{i}")))
            .respond_with(ResponseTemplate::new(302).insert_header("location", next.as_str()))
            .mount(server)
            .await;
    }
    mount_page(server, "/landing", 200, PAGE).await;
}

#[tokio::test]
async fn follows_five_redirects() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 5).await;
    let fetcher = fetcher();

    let body = fetcher
        .fetch(&format!("{}/hop/1", server.uri()), &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(body, PAGE);
    let diagnostics = fetcher.last_response().unwrap();
    assert!(diagnostics.url.ends_with("/landing"));
}

#[tokio::test]
async fn rejects_sixth_redirect() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 6).await;

    let err = fetcher()
        .fetch(&format!("{}/hop/1", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, FetchCause::Redirect(_)), "{err}");
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rejects_redirect_to_other_scheme() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "ftp://files.shop.test/feed.csv"),
        )
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/download", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, FetchCause::Redirect(_)), "{err}");
}

// ---------------------------------------------------------------------------
// Failures before or without a response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let fetcher = HttpFetcher::new(
        FetcherConfig {
            timeout: Duration::from_millis(250),
            ..FetcherConfig::default()
        },
        agents(),
    )
    .unwrap();

    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, FetchCause::Timeout), "{err}");
    assert!(err.is_transient());
    assert!(fetcher.last_response().is_none());
}

#[tokio::test]
async fn timed_out_fetch_reports_its_own_identity() {
    let server = MockServer::start().await;
    mount_page(&server, "/fast", 200, PAGE).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let fetcher = HttpFetcher::new(
        FetcherConfig {
            timeout: Duration::from_millis(250),
            ..FetcherConfig::default()
        },
        agents(),
    )
    .unwrap();

    fetcher
        .fetch(&format!("{}/fast", server.uri()), &FetchOptions::default())
        .await
        .unwrap();
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.cause, FetchCause::Timeout), "{err}");
    assert_eq!(err.user_agent.as_deref(), Some("kibble-test/agent-b"));
    assert!(err.proxy.is_none());
    assert_eq!(
        fetcher.last_response().unwrap().user_agent,
        "kibble-test/agent-a",
        "the shared slot still holds the earlier response"
    );
}

#[tokio::test]
async fn invalid_url_is_rejected_without_a_request() {
    let fetcher = fetcher();
    for url in ["not a url", "ftp://files.shop.test/feed.csv"] {
        let err = fetcher.fetch(url, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err.cause, FetchCause::InvalidUrl { .. }), "{url}");
        assert!(!err.is_transient());
    }
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    mount_page(&server, "/huge", 200, &"x".repeat(4096)).await;
    let fetcher = HttpFetcher::new(
        FetcherConfig {
            max_body_bytes: 1024,
            ..FetcherConfig::default()
        },
        agents(),
    )
    .unwrap();

    let err = fetcher
        .fetch(&format!("{}/huge", server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err.cause, FetchCause::BodyTooLarge { limit_bytes: 1024 }));
}

// ---------------------------------------------------------------------------
// Proxy rotation
// ---------------------------------------------------------------------------

/// Available provider that counts rotations and optionally routes through
/// `endpoint`.
struct CountingProvider {
    rotations: AtomicUsize,
    endpoint: Option<String>,
}

impl ProxyProvider for CountingProvider {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn proxy_config(&self) -> Option<ProxyConfig> {
        let n = self.rotations.load(Ordering::SeqCst);
        self.endpoint.as_ref().map(|endpoint| ProxyConfig {
            endpoint: endpoint.clone(),
            username: format!("tester-session-{n}"),
            password: "hunter2".to_owned(),
        })
    }

    fn rotate(&self) {
        self.rotations.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn rotates_proxy_before_every_request() {
    let server = MockServer::start().await;
    mount_page(&server, "/dogs", 200, PAGE).await;
    let provider = Arc::new(CountingProvider {
        rotations: AtomicUsize::new(0),
        endpoint: None,
    });
    let fetcher = fetcher().with_proxy(provider.clone());
    let url = format!("{}/dogs", server.uri());

    for _ in 0..4 {
        fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();
    }
    assert_eq!(provider.rotations.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn routes_through_proxy_with_masked_diagnostics() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dogs"))
        .and(header_exists("proxy-authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&proxy)
        .await;
    let provider = Arc::new(CountingProvider {
        rotations: AtomicUsize::new(0),
        endpoint: Some(proxy.address().to_string()),
    });
    let fetcher = fetcher().with_proxy(provider);

    let body = fetcher
        .fetch("http://shop.invalid/dogs", &FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(body, PAGE);

    let masked = fetcher.last_response().unwrap().proxy.unwrap();
    assert!(masked.contains("tester-session-1"));
    assert!(masked.contains("****"));
    assert!(!masked.contains("hunter2"));
}
