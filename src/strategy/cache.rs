//! Caching decorator around a single download strategy
//!
//! Every downloaded version is copied into `<cache dir>/<version>/paket.exe`
//! and served from there on later requests. The directory listing doubles as
//! the index of versions available offline: when the wrapped strategy cannot
//! reach its source and nothing follows this strategy in a chain, the latest
//! version is answered from that listing instead.

use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::config::ARTIFACT_NAME;
use crate::strategy::DownloadStrategy;
use crate::strategy::error::StrategyError;
use crate::strategy::fs::FileSystem;
use crate::version::semver::select_latest;

/// Version reported by an empty cache
const EMPTY_CACHE_VERSION: &str = "0";

pub struct CacheStrategy {
    effective: Box<dyn DownloadStrategy>,
    file_system: Box<dyn FileSystem>,
    cache_dir: PathBuf,
    has_fallback: bool,
}

impl CacheStrategy {
    /// Wrap `effective`, which must not have a fallback of its own.
    pub fn new(
        effective: Box<dyn DownloadStrategy>,
        file_system: Box<dyn FileSystem>,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<Self, StrategyError> {
        if effective.has_fallback() {
            return Err(StrategyError::Configuration(format!(
                "cached strategy around '{}' must not wrap a strategy with a fallback",
                effective.name()
            )));
        }

        Ok(Self {
            effective,
            file_system,
            cache_dir: cache_dir.into(),
            has_fallback: false,
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.cache_dir.join(version)
    }

    fn cached_artifact(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(ARTIFACT_NAME)
    }

    /// Best version among the cache directory names, or "0" for an empty cache.
    fn latest_version_in_cache(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        self.file_system.create_directory(&self.cache_dir)?;

        let names = self
            .file_system
            .list_directories(&self.cache_dir)?
            .into_iter()
            .filter_map(|dir| {
                dir.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            });

        Ok(select_latest(names, ignore_prerelease)
            .unwrap_or_else(|| EMPTY_CACHE_VERSION.to_string()))
    }
}

#[async_trait::async_trait]
impl DownloadStrategy for CacheStrategy {
    fn name(&self) -> String {
        format!("{} - cached", self.effective.name())
    }

    fn has_fallback(&self) -> bool {
        self.has_fallback
    }

    fn link_fallback(&mut self) {
        self.has_fallback = true;
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        match self.effective.get_latest_version(ignore_prerelease).await {
            Err(e) if e.is_network() && !self.has_fallback => {
                debug!("Online lookup failed: {}", e);
                let latest = self.latest_version_in_cache(ignore_prerelease)?;
                info!(
                    "Unable to look up the latest version online, the cache contains version {}.",
                    latest
                );
                Ok(latest)
            }
            result => result,
        }
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        let cached = self.cached_artifact(version);

        if !self.file_system.file_exists(&cached) {
            info!("Version {} not found in cache.", version);
            self.effective.download_version(version, target).await?;

            trace!("Caching version {} for later", version);
            self.file_system.create_directory(&self.version_dir(version))?;
            self.file_system.copy_file(target, &cached, true)?;
        } else {
            info!("Copying version {} from cache.", version);
            trace!("{} -> {}", cached.display(), target.display());
            self.file_system.copy_file(&cached, target, true)?;
        }

        Ok(())
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        self.effective.self_update(version).await
    }
}
