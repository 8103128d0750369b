//! Strategy test utilities

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use paket_bootstrapper::strategy::DownloadStrategy;
use paket_bootstrapper::strategy::error::StrategyError;

/// Shared call counters, readable after the strategy has been boxed
#[derive(Debug, Clone, Default)]
pub struct Calls {
    lookups: Arc<AtomicUsize>,
    downloads: Arc<AtomicUsize>,
    self_updates: Arc<AtomicUsize>,
}

impl Calls {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn self_updates(&self) -> usize {
        self.self_updates.load(Ordering::SeqCst)
    }
}

/// Fake source that either serves a fixed version or behaves as unreachable
pub struct FakeStrategy {
    name: String,
    latest: Option<String>,
    artifact: Vec<u8>,
    has_fallback: bool,
    calls: Calls,
}

impl FakeStrategy {
    /// A reachable source whose latest version is `latest`.
    pub fn online(name: &str, latest: &str) -> Self {
        Self {
            name: name.to_string(),
            latest: Some(latest.to_string()),
            artifact: format!("{} from {}", name, latest).into_bytes(),
            has_fallback: false,
            calls: Calls::default(),
        }
    }

    /// A source whose every request fails with a network error.
    pub fn offline(name: &str) -> Self {
        Self {
            name: name.to_string(),
            latest: None,
            artifact: Vec::new(),
            has_fallback: false,
            calls: Calls::default(),
        }
    }

    pub fn with_artifact(mut self, artifact: &[u8]) -> Self {
        self.artifact = artifact.to_vec();
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.has_fallback = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }

    pub fn boxed(self) -> Box<dyn DownloadStrategy> {
        Box::new(self)
    }

    fn unreachable(&self) -> StrategyError {
        StrategyError::UnexpectedStatus {
            status: 503,
            url: format!("https://{}.invalid", self.name),
        }
    }
}

#[async_trait]
impl DownloadStrategy for FakeStrategy {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn has_fallback(&self) -> bool {
        self.has_fallback
    }

    async fn get_latest_version(&self, _ignore_prerelease: bool) -> Result<String, StrategyError> {
        self.calls.lookups.fetch_add(1, Ordering::SeqCst);
        self.latest.clone().ok_or_else(|| self.unreachable())
    }

    async fn download_version(&self, _version: &str, target: &Path) -> Result<(), StrategyError> {
        self.calls.downloads.fetch_add(1, Ordering::SeqCst);
        if self.latest.is_none() {
            return Err(self.unreachable());
        }
        std::fs::write(target, &self.artifact)?;
        Ok(())
    }

    async fn self_update(&self, _version: &str) -> Result<(), StrategyError> {
        self.calls.self_updates.fetch_add(1, Ordering::SeqCst);
        if self.latest.is_none() {
            return Err(self.unreachable());
        }
        Ok(())
    }
}
