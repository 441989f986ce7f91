use thiserror::Error;

/// Why a single fetch failed.
#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("redirect rejected: {0}")]
    Redirect(#[source] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("response body exceeds {limit_bytes} bytes")]
    BodyTooLarge { limit_bytes: usize },

    #[error("bot challenge page served instead of content")]
    Blocked,

    #[error("proxy rejected: {reason}")]
    Proxy { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

/// A failed fetch, carrying the URL that was requested and the identity it
/// was sent with.
#[derive(Debug, Error)]
#[error("fetch of {url} failed: {cause}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub cause: FetchCause,
    /// `None` when the request failed before an identity was chosen.
    pub user_agent: Option<String>,
    /// Masked proxy of the failed request, `None` for direct requests.
    pub proxy: Option<String>,
}

impl FetchError {
    pub(crate) fn new(url: &str, cause: FetchCause) -> Self {
        Self {
            url: url.to_owned(),
            cause,
            user_agent: None,
            proxy: None,
        }
    }

    pub(crate) fn sent_as(mut self, user_agent: &str, proxy: Option<&str>) -> Self {
        self.user_agent = Some(user_agent.to_owned());
        self.proxy = proxy.map(str::to_owned);
        self
    }

    /// Maps a transport-level reqwest error onto the matching cause.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if err.is_redirect() {
            FetchCause::Redirect(err)
        } else if err.is_connect() {
            FetchCause::Connect(err)
        } else {
            FetchCause::Http(err)
        };
        Self::new(url, cause)
    }

    /// HTTP status of the failed response, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.cause {
            FetchCause::Status { status } => Some(status),
            _ => None,
        }
    }

    /// `true` when retrying the same URL later, possibly through another
    /// identity, could succeed.
    ///
    /// Timeouts, connection failures, bot challenges, 429 and 5xx statuses are
    /// transient. Client errors, redirect violations and oversized bodies are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match &self.cause {
            FetchCause::Timeout | FetchCause::Connect(_) | FetchCause::Blocked => true,
            FetchCause::Status { status } => *status == 429 || (500..600).contains(status),
            FetchCause::Http(err) => err.is_request() || err.is_body(),
            FetchCause::InvalidUrl { .. }
            | FetchCause::Redirect(_)
            | FetchCause::BodyTooLarge { .. }
            | FetchCause::Proxy { .. } => false,
        }
    }
}

/// Errors raised while building scraper components.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client could not be built: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("user agent pool must contain at least one entry")]
    EmptyUserAgentPool,

    #[error("invalid selector \"{selector}\" in {retailer} profile: {reason}")]
    InvalidSelector {
        retailer: String,
        selector: String,
        reason: String,
    },

    #[error("invalid pattern \"{pattern}\" in {retailer} profile: {source}")]
    InvalidPattern {
        retailer: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{kind} extractors for {first} and {second} both claim {url}")]
    OverlappingExtractors {
        kind: &'static str,
        first: String,
        second: String,
        url: String,
    },

    #[error("retailer profile {slug} is registered twice")]
    DuplicateProfile { slug: String },

    #[error("host {host} is claimed by both {first} and {second}")]
    SharedHost {
        host: String,
        first: String,
        second: String,
    },
}

/// A single field that could not be read from a page. Never fatal: the field
/// is left absent and the error is logged.
#[derive(Debug, Error)]
#[error("could not parse {field}: {reason}")]
pub struct ParseError {
    pub field: &'static str,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
