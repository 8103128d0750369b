//! Ordered fallback between download strategies

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::warn;

use crate::strategy::DownloadStrategy;
use crate::strategy::error::StrategyError;

type Attempt<'a, T> = Pin<Box<dyn Future<Output = Result<T, StrategyError>> + Send + 'a>>;

/// Strategies consulted in order until one succeeds.
///
/// A network failure moves on to the next strategy; any other failure, or a
/// failure of the last strategy, is returned as is.
pub struct FallbackChain {
    strategies: Vec<Box<dyn DownloadStrategy>>,
}

impl FallbackChain {
    /// Build a chain from a non-empty sequence of strategies.
    ///
    /// Every strategy except the last one is told that a fallback follows it.
    pub fn new(mut strategies: Vec<Box<dyn DownloadStrategy>>) -> Result<Self, StrategyError> {
        let Some((_, linked)) = strategies.split_last_mut() else {
            return Err(StrategyError::Configuration(
                "a fallback chain needs at least one strategy".to_string(),
            ));
        };

        for strategy in linked {
            strategy.link_fallback();
        }

        Ok(Self { strategies })
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    async fn first_success<'s, 'f, T, F>(
        &'s self,
        action: &str,
        mut attempt: F,
    ) -> Result<T, StrategyError>
    where
        's: 'f,
        F: FnMut(&'s dyn DownloadStrategy) -> Attempt<'f, T>,
    {
        let mut remaining = self.strategies.iter().peekable();

        while let Some(strategy) = remaining.next() {
            match attempt(strategy.as_ref()).await {
                Err(e) if e.is_network() => {
                    let Some(next) = remaining.peek() else {
                        return Err(e);
                    };
                    warn!(
                        "{} with '{}' failed: {}. Trying '{}'.",
                        action,
                        strategy.name(),
                        e,
                        next.name()
                    );
                }
                result => return result,
            }
        }

        Err(StrategyError::Configuration(
            "a fallback chain needs at least one strategy".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl DownloadStrategy for FallbackChain {
    fn name(&self) -> String {
        self.strategies
            .iter()
            .map(|strategy| strategy.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn has_fallback(&self) -> bool {
        self.strategies.len() > 1
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        self.first_success("GetLatestVersion", |strategy| {
            strategy.get_latest_version(ignore_prerelease)
        })
        .await
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        self.first_success("DownloadVersion", |strategy| {
            strategy.download_version(version, target)
        })
        .await
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        self.first_success("SelfUpdate", |strategy| strategy.self_update(version))
            .await
    }
}
