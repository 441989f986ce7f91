use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the fetcher picks the next user agent from its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationMode {
    /// Cycle through the pool in order.
    #[default]
    RoundRobin,
    /// Pick uniformly at random on every request.
    Random,
}

impl std::fmt::Display for RotationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationMode::RoundRobin => write!(f, "round_robin"),
            RotationMode::Random => write!(f, "random"),
        }
    }
}

/// Raw proxy credentials as read from the environment.
///
/// Any subset may be present; a provider only reports itself available when
/// all three are set.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// `host:port` of the proxy gateway.
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// `true` when endpoint, username and password are all non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.endpoint, &self.username, &self.password]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl std::fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySettings")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub fetch_timeout_secs: u64,
    pub fetch_connect_timeout_secs: u64,
    pub user_agent_mode: RotationMode,
    pub max_concurrent_crawls: usize,
    /// Delay between successive requests to one retailer when the catalog
    /// does not set its own.
    pub default_request_delay_ms: u64,
    /// Caller-side retry attempts after the first failed fetch.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub proxy: ProxySettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field(
                "fetch_connect_timeout_secs",
                &self.fetch_connect_timeout_secs,
            )
            .field("user_agent_mode", &self.user_agent_mode)
            .field("max_concurrent_crawls", &self.max_concurrent_crawls)
            .field("default_request_delay_ms", &self.default_request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("proxy", &self.proxy)
            .finish()
    }
}
