//! Rotating pool of browser user-agent strings.

use std::sync::atomic::{AtomicUsize, Ordering};

use kibble_core::RotationMode;
use rand::Rng;

use crate::error::ScraperError;

/// Current desktop browser identities. Kept to mainstream builds so the pool
/// never stands out against real traffic.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36 Edg/125.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
];

#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    mode: RotationMode,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    /// # Errors
    ///
    /// Returns [`ScraperError::EmptyUserAgentPool`] if `agents` has no
    /// non-blank entry.
    pub fn new(agents: Vec<String>, mode: RotationMode) -> Result<Self, ScraperError> {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();
        if agents.is_empty() {
            return Err(ScraperError::EmptyUserAgentPool);
        }
        Ok(Self {
            agents,
            mode,
            cursor: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn with_defaults(mode: RotationMode) -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_owned()).collect(),
            mode,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the user agent for the next request.
    pub fn next_agent(&self) -> &str {
        let idx = match self.mode {
            RotationMode::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len()
            }
            RotationMode::Random => rand::rng().random_range(0..self.agents.len()),
        };
        &self.agents[idx]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn mode(&self) -> RotationMode {
        self.mode
    }
}
