//! Egress identity providers for the fetcher.
//!
//! A [`ProxyProvider`] hands out the proxy to use for the next request and can
//! be asked to rotate to a fresh identity. [`ProxyManager`] composes several
//! providers behind the same trait.

mod manager;
mod session;

use std::fmt;

pub use manager::ProxyManager;
pub use session::SessionProxyProvider;

/// Connection details for one proxied request.
///
/// `Display` and `Debug` never show the password, so a config can be logged
/// as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// `host:port`, optionally prefixed with a scheme.
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl ProxyConfig {
    /// Proxy URL with the scheme defaulted to `http`.
    #[must_use]
    pub fn proxy_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }

    /// Builds the reqwest proxy routing every scheme through this endpoint.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the endpoint is not a valid proxy URL.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy, reqwest::Error> {
        Ok(reqwest::Proxy::all(self.proxy_url())?.basic_auth(&self.username, &self.password))
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = self.proxy_url();
        let (scheme, rest) = url.split_once("://").unwrap_or(("http", url.as_str()));
        write!(f, "{scheme}://{}:****@{rest}", self.username)
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// A source of proxy identities.
///
/// Implementations are shared between concurrent fetches, so every method
/// takes `&self`.
pub trait ProxyProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// The proxy for the next request, or `None` when unavailable.
    fn proxy_config(&self) -> Option<ProxyConfig>;

    /// Switches to a fresh egress identity.
    fn rotate(&self);
}

/// Provider used when no proxy is configured. Never available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProxyProvider;

impl ProxyProvider for NullProxyProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn proxy_config(&self) -> Option<ProxyConfig> {
        None
    }

    fn rotate(&self) {}
}
