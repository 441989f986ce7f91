//! Anti-bot HTTP client for retailer pages.
//!
//! [`HttpFetcher`] rotates its browser identity on every call, sends a
//! navigation header set, optionally routes through a [`ProxyProvider`], and
//! rejects challenge interstitials. It never retries or sleeps; see
//! [`crate::rate_limit`] for the caller-side helpers.

mod challenge;
mod headers;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use kibble_core::{AppConfig, RetailerCatalog};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;

pub use challenge::looks_like_bot_challenge;
pub use headers::{find_header, merge_headers, BROWSER_HEADERS};

use crate::error::{FetchCause, FetchError, ScraperError};
use crate::proxy::{NullProxyProvider, ProxyConfig, ProxyManager, ProxyProvider, SessionProxyProvider};
use crate::user_agent::UserAgentPool;

pub const MAX_REDIRECTS: usize = 5;
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Budget for the whole exchange, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
    /// Configured defaults layered over [`BROWSER_HEADERS`].
    pub default_headers: Vec<(String, String)>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: MAX_REDIRECTS,
            max_body_bytes: MAX_BODY_BYTES,
            default_headers: Vec::new(),
        }
    }
}

impl FetcherConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, catalog: &RetailerCatalog) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch_timeout_secs),
            connect_timeout: Duration::from_secs(config.fetch_connect_timeout_secs),
            default_headers: catalog
                .default_headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ..Self::default()
        }
    }
}

/// Per-call knobs.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// The retailer's own header set from the catalog.
    pub retailer_headers: Vec<(String, String)>,
    /// Per-call overrides; highest precedence.
    pub headers: Vec<(String, String)>,
    /// When set, non-2xx statuses and challenge pages are errors.
    pub strict: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retailer_headers: Vec::new(),
            headers: Vec::new(),
            strict: true,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn for_retailer(catalog: &RetailerCatalog, retailer_slug: &str) -> Self {
        let retailer_headers = catalog
            .retailer(retailer_slug)
            .map(|r| {
                r.headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            retailer_headers,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Return the body of non-2xx responses instead of failing.
    #[must_use]
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }
}

/// What the most recent response looked like, for debugging blocked or
/// unexpected pages.
#[derive(Debug, Clone)]
pub struct ResponseDiagnostics {
    pub requested_url: String,
    /// URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub elapsed: Duration,
    pub user_agent: String,
    /// Masked proxy, `None` for direct requests.
    pub proxy: Option<String>,
}

pub struct HttpFetcher {
    config: FetcherConfig,
    direct: reqwest::Client,
    user_agents: UserAgentPool,
    proxy: Arc<dyn ProxyProvider>,
    last_response: Mutex<Option<ResponseDiagnostics>>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("config", &self.config)
            .field("user_agents", &self.user_agents.len())
            .field("proxy", &self.proxy.name())
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Creates a fetcher that connects directly.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ClientBuild`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: FetcherConfig, user_agents: UserAgentPool) -> Result<Self, ScraperError> {
        let direct = build_client(&config, None).map_err(ScraperError::ClientBuild)?;
        Ok(Self {
            config,
            direct,
            user_agents,
            proxy: Arc::new(NullProxyProvider),
            last_response: Mutex::new(None),
        })
    }

    /// Builds a fetcher from environment configuration: default user-agent
    /// pool in the configured rotation mode, catalog default headers, and a
    /// session proxy when credentials are complete.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::ClientBuild`] if the HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        catalog: &RetailerCatalog,
    ) -> Result<Self, ScraperError> {
        let fetcher = Self::new(
            FetcherConfig::from_app_config(config, catalog),
            UserAgentPool::with_defaults(config.user_agent_mode),
        )?;
        if config.proxy.is_complete() {
            let session: Arc<dyn ProxyProvider> =
                Arc::new(SessionProxyProvider::new("session", config.proxy.clone()));
            return Ok(fetcher.with_proxy(Arc::new(ProxyManager::new(vec![session]))));
        }
        Ok(fetcher)
    }

    #[must_use]
    pub fn with_proxy(mut self, provider: Arc<dyn ProxyProvider>) -> Self {
        self.proxy = provider;
        self
    }

    /// Fetches `url` and returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on an invalid URL, transport failure or timeout,
    /// a rejected redirect, an oversized body, and, when `options.strict` is
    /// set, a non-2xx status or a bot-challenge page.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            FetchError::new(
                url,
                FetchCause::InvalidUrl {
                    reason: e.to_string(),
                },
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::new(
                url,
                FetchCause::InvalidUrl {
                    reason: format!("unsupported scheme {}", parsed.scheme()),
                },
            ));
        }

        let headers = merge_headers(&[
            &self.config.default_headers,
            &options.retailer_headers,
            &options.headers,
        ]);
        let user_agent = find_header(&headers, "User-Agent").map_or_else(
            || self.user_agents.next_agent().to_owned(),
            str::to_owned,
        );
        let (client, proxy) = self.client_for_request(url)?;
        let proxy_label = proxy.as_ref().map(ProxyConfig::to_string);

        let sent: Result<String, FetchError> = async {
            let started = Instant::now();
            let mut response = client
                .get(parsed)
                .headers(build_header_map(&headers, &user_agent))
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(url, e))?;

            let status = response.status();
            let final_url = response.url().to_string();
            let response_headers: Vec<(String, String)> = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
                .collect();

            let limit = self.config.max_body_bytes;
            if response
                .content_length()
                .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit))
            {
                return Err(FetchError::new(url, FetchCause::BodyTooLarge { limit_bytes: limit }));
            }
            let mut bytes: Vec<u8> = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| FetchError::from_reqwest(url, e))?
            {
                if bytes.len() + chunk.len() > limit {
                    return Err(FetchError::new(url, FetchCause::BodyTooLarge { limit_bytes: limit }));
                }
                bytes.extend_from_slice(&chunk);
            }
            let body = String::from_utf8_lossy(&bytes).into_owned();
            let elapsed = started.elapsed();

            tracing::debug!(
                url,
                final_url = %final_url,
                status = status.as_u16(),
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                bytes = bytes.len(),
                user_agent = %user_agent,
                proxy = proxy_label.as_deref().unwrap_or("direct"),
                "fetched page"
            );
            self.record(ResponseDiagnostics {
                requested_url: url.to_owned(),
                url: final_url,
                status: status.as_u16(),
                headers: response_headers,
                elapsed,
                user_agent: user_agent.clone(),
                proxy: proxy_label.clone(),
            });

            if options.strict {
                if !status.is_success() {
                    return Err(FetchError::new(
                        url,
                        FetchCause::Status {
                            status: status.as_u16(),
                        },
                    ));
                }
                if looks_like_bot_challenge(&body) {
                    tracing::warn!(url, "bot challenge page served");
                    return Err(FetchError::new(url, FetchCause::Blocked));
                }
            }
            Ok(body)
        }
        .await;
        sent.map_err(|e| e.sent_as(&user_agent, proxy_label.as_deref()))
    }

    /// Diagnostics of the most recent completed response.
    #[must_use]
    pub fn last_response(&self) -> Option<ResponseDiagnostics> {
        match self.last_response.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn last_status(&self) -> Option<u16> {
        self.last_response().map(|d| d.status)
    }

    fn record(&self, diagnostics: ResponseDiagnostics) {
        match self.last_response.lock() {
            Ok(mut guard) => *guard = Some(diagnostics),
            Err(poisoned) => *poisoned.into_inner() = Some(diagnostics),
        }
    }

    /// Rotates the proxy identity and returns the client to use. Falls back
    /// to the direct client when no proxy is available.
    fn client_for_request(
        &self,
        url: &str,
    ) -> Result<(reqwest::Client, Option<ProxyConfig>), FetchError> {
        if !self.proxy.is_available() {
            return Ok((self.direct.clone(), None));
        }
        self.proxy.rotate();
        let Some(proxy) = self.proxy.proxy_config() else {
            return Ok((self.direct.clone(), None));
        };
        let client = build_client(&self.config, Some(&proxy)).map_err(|e| {
            FetchError::new(
                url,
                FetchCause::Proxy {
                    reason: format!("{proxy}: {e}"),
                },
            )
        })?;
        Ok((client, Some(proxy)))
    }
}

fn build_client(
    config: &FetcherConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client, reqwest::Error> {
    let builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .redirect(redirect_policy(config.max_redirects));
    let builder = match proxy {
        Some(proxy) => builder.proxy(proxy.to_reqwest()?),
        None => builder.no_proxy(),
    };
    builder.build()
}

/// Follows at most `max` redirects, only to http(s), and never from https
/// down to http.
fn redirect_policy(max: usize) -> Policy {
    Policy::custom(move |attempt| {
        let hops = attempt.previous().len();
        let scheme = attempt.url().scheme().to_owned();
        let from_https = attempt
            .previous()
            .last()
            .is_some_and(|prev| prev.scheme() == "https");

        if hops > max {
            attempt.error(format!("more than {max} redirects"))
        } else if scheme != "http" && scheme != "https" {
            attempt.error(format!("redirect to unsupported scheme {scheme}"))
        } else if from_https && scheme == "http" {
            attempt.error("redirect downgrades https to http")
        } else {
            attempt.follow()
        }
    })
}

fn build_header_map(headers: &[(String, String)], user_agent: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "skipping invalid request header"),
        }
    }
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        map.insert(USER_AGENT, value);
    }
    map
}
