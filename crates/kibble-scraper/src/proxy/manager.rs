use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ProxyConfig, ProxyProvider};

/// Round-robin composition of several providers.
///
/// The manager is itself a [`ProxyProvider`], so the fetcher does not care
/// whether it holds one provider or many. With no provider available it
/// reports itself unavailable rather than failing.
pub struct ProxyManager {
    providers: Vec<Arc<dyn ProxyProvider>>,
    cursor: AtomicUsize,
}

impl ProxyManager {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn ProxyProvider>>) -> Self {
        Self {
            providers,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Scans from the cursor for the first available provider and parks the
    /// cursor on it.
    #[must_use]
    pub fn current_provider(&self) -> Option<Arc<dyn ProxyProvider>> {
        self.current().map(|(_, provider)| Arc::clone(provider))
    }

    fn current(&self) -> Option<(usize, &Arc<dyn ProxyProvider>)> {
        let len = self.providers.len();
        if len == 0 {
            return None;
        }
        let start = self.cursor.load(Ordering::Acquire) % len;
        for offset in 0..len {
            let idx = (start + offset) % len;
            let provider = &self.providers[idx];
            if provider.is_available() {
                self.cursor.store(idx, Ordering::Release);
                return Some((idx, provider));
            }
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProxyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ProxyManager")
            .field("providers", &names)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl ProxyProvider for ProxyManager {
    fn name(&self) -> &'static str {
        "manager"
    }

    fn is_available(&self) -> bool {
        self.current().is_some()
    }

    fn proxy_config(&self) -> Option<ProxyConfig> {
        self.current().and_then(|(_, provider)| provider.proxy_config())
    }

    /// Rotates the active provider's session, then moves the cursor past it
    /// so the next request starts from the following provider.
    fn rotate(&self) {
        if let Some((idx, provider)) = self.current() {
            provider.rotate();
            self.cursor
                .store((idx + 1) % self.providers.len(), Ordering::Release);
            tracing::debug!(provider = provider.name(), "rotated proxy identity");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;
    use crate::proxy::NullProxyProvider;

    struct FakeProvider {
        name: &'static str,
        available: AtomicBool,
        rotations: AtomicUsize,
    }

    impl FakeProvider {
        fn new(name: &'static str, available: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                available: AtomicBool::new(available),
                rotations: AtomicUsize::new(0),
            })
        }
    }

    impl ProxyProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available.load(Ordering::SeqCst)
        }

        fn proxy_config(&self) -> Option<ProxyConfig> {
            self.is_available().then(|| ProxyConfig {
                endpoint: format!("{}.proxy.test:8000", self.name),
                username: "u".to_owned(),
                password: "p".to_owned(),
            })
        }

        fn rotate(&self) {
            self.rotations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn endpoint(manager: &ProxyManager) -> Option<String> {
        manager.proxy_config().map(|c| c.endpoint)
    }

    #[test]
    fn empty_manager_is_unavailable() {
        let manager = ProxyManager::new(vec![]);
        manager.rotate();
        assert!(!manager.is_available());
        assert!(manager.proxy_config().is_none());
    }

    #[test]
    fn all_unavailable_reports_unavailable() {
        let manager = ProxyManager::new(vec![
            Arc::new(NullProxyProvider),
            FakeProvider::new("a", false),
        ]);
        assert!(!manager.is_available());
        assert!(manager.current_provider().is_none());
    }

    #[test]
    fn skips_unavailable_providers() {
        let manager = ProxyManager::new(vec![
            Arc::new(NullProxyProvider),
            FakeProvider::new("b", true),
        ]);
        assert!(manager.is_available());
        assert_eq!(endpoint(&manager).as_deref(), Some("b.proxy.test:8000"));
    }

    #[test]
    fn rotate_advances_round_robin_and_rotates_active() {
        let a = FakeProvider::new("a", true);
        let b = FakeProvider::new("b", true);
        let manager = ProxyManager::new(vec![a.clone(), b.clone()]);

        assert_eq!(endpoint(&manager).as_deref(), Some("a.proxy.test:8000"));
        manager.rotate();
        assert_eq!(a.rotations.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint(&manager).as_deref(), Some("b.proxy.test:8000"));
        manager.rotate();
        assert_eq!(b.rotations.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint(&manager).as_deref(), Some("a.proxy.test:8000"));
    }

    #[test]
    fn provider_dropping_out_is_skipped() {
        let a = FakeProvider::new("a", true);
        let b = FakeProvider::new("b", true);
        let manager = ProxyManager::new(vec![a.clone(), b.clone()]);
        a.available.store(false, Ordering::SeqCst);
        manager.rotate();
        assert_eq!(b.rotations.load(Ordering::SeqCst), 1);
        assert_eq!(a.rotations.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint(&manager).as_deref(), Some("b.proxy.test:8000"));
    }

    #[test]
    fn concurrent_rotation_is_safe() {
        let providers: Vec<Arc<dyn ProxyProvider>> = (0..3)
            .map(|_| FakeProvider::new("x", true) as Arc<dyn ProxyProvider>)
            .collect();
        let manager = Arc::new(ProxyManager::new(providers));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        manager.rotate();
                        assert!(manager.proxy_config().is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
