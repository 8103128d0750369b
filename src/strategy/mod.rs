//! Download strategies for resolving and fetching paket.exe
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐     ┌───────────────┐     ┌───────────────┐
//! │ FallbackChain │────▶│ Instrumented  │────▶│ CacheStrategy │
//! │ (walk order)  │     │ (timing/trace)│     │ (local store) │
//! └───────────────┘     └───────────────┘     └───────────────┘
//!                                                     │
//!                                                     ▼
//!                                             ┌───────────────┐
//!                                             │    Sources    │
//!                                             │(GitHub, NuGet)│
//!                                             └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: Caching decorator with degraded-mode lookup from the cache directory
//! - [`chain`]: Ordered fallback between strategies
//! - [`instrument`]: Timing and trace middleware shared by every strategy
//! - [`fs`]: File system operations used by the cache
//! - [`sources`]: Concrete remote strategies
//! - [`error`]: Error type shared by all strategies

#[cfg(test)]
use mockall::automock;

use std::path::Path;

use crate::strategy::error::StrategyError;

pub mod cache;
pub mod chain;
pub mod error;
pub mod fs;
pub mod instrument;
pub mod sources;

pub use cache::CacheStrategy;
pub use chain::FallbackChain;
pub use instrument::Instrumented;

/// A source that can resolve, download and self-update paket.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait DownloadStrategy: Send + Sync {
    /// Human readable name used in diagnostics
    fn name(&self) -> String;

    /// Whether a further strategy is consulted when this one fails
    fn has_fallback(&self) -> bool {
        false
    }

    /// Record that a further strategy follows this one in a chain.
    fn link_fallback(&mut self) {}

    /// Resolve the newest available version.
    ///
    /// With `ignore_prerelease`, prerelease candidates rank below every
    /// stable version.
    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError>;

    /// Place the artifact for `version` at `target`, overwriting any existing file.
    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError>;

    /// Replace the running bootstrapper with `version`.
    async fn self_update(&self, version: &str) -> Result<(), StrategyError>;
}

#[async_trait::async_trait]
impl<S: DownloadStrategy + ?Sized> DownloadStrategy for Box<S> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn has_fallback(&self) -> bool {
        (**self).has_fallback()
    }

    fn link_fallback(&mut self) {
        (**self).link_fallback()
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        (**self).get_latest_version(ignore_prerelease).await
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        (**self).download_version(version, target).await
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        (**self).self_update(version).await
    }
}
