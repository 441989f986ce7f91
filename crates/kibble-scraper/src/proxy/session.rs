use std::sync::Mutex;

use kibble_core::ProxySettings;
use rand::Rng;

use super::{ProxyConfig, ProxyProvider};

const SESSION_ID_LEN: usize = 10;
const SESSION_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Residential-gateway style provider: the exit IP is pinned by a session id
/// embedded in the proxy username (`<user>-session-<id>`), so minting a new id
/// forces a new egress address.
#[derive(Debug)]
pub struct SessionProxyProvider {
    name: String,
    settings: ProxySettings,
    session_id: Mutex<String>,
}

impl SessionProxyProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, settings: ProxySettings) -> Self {
        Self {
            name: name.into(),
            settings,
            session_id: Mutex::new(new_session_id()),
        }
    }

    /// The session id currently embedded in the username.
    #[must_use]
    pub fn session_id(&self) -> String {
        self.session_id
            .lock()
            .map(|id| id.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProxyProvider for SessionProxyProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.settings.is_complete()
    }

    fn proxy_config(&self) -> Option<ProxyConfig> {
        if !self.is_available() {
            return None;
        }
        let endpoint = self.settings.endpoint.as_deref()?.trim();
        let username = self.settings.username.as_deref()?.trim();
        let password = self.settings.password.as_deref()?;
        Some(ProxyConfig {
            endpoint: endpoint.to_owned(),
            username: format!("{username}-session-{}", self.session_id()),
            password: password.to_owned(),
        })
    }

    fn rotate(&self) {
        let fresh = new_session_id();
        match self.session_id.lock() {
            Ok(mut id) => *id = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }
}

fn new_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| char::from(SESSION_ALPHABET[rng.random_range(0..SESSION_ALPHABET.len())]))
        .collect()
}
