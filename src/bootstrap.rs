//! Strategy assembly and the bootstrap run

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::GitHubConfig;
use crate::logging::Diagnostics;
use crate::strategy::error::StrategyError;
use crate::strategy::fs::LocalFileSystem;
use crate::strategy::sources::{GitHubStrategy, NugetSource, NugetStrategy};
use crate::strategy::{CacheStrategy, DownloadStrategy, FallbackChain, Instrumented};
use crate::transport::HttpTransport;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("No version of paket is available")]
    NoVersionAvailable,
}

/// Which version to install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Latest { prerelease: bool },
    Exact(String),
}

/// Order in which the sources are consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrder {
    GitHubFirst,
    NugetFirst,
    NugetOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Where paket.exe is placed
    pub target: PathBuf,
    /// The running bootstrapper, replaced by self-update
    pub self_path: PathBuf,
    pub version: VersionRequest,
    pub sources: SourceOrder,
    pub nuget_source: NugetSource,
    pub github: GitHubConfig,
    /// Skip all checks when the target is younger than this many minutes
    pub max_file_age: Option<u64>,
    pub self_update: bool,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    UpToDate,
    Downloaded(String),
    SelfUpdated(String),
}

/// Assemble the fallback chain described by `options`.
///
/// Each source is instrumented, then wrapped in a caching strategy unless
/// the cache is disabled; the caching strategies are instrumented too.
pub fn build_strategy(
    options: &Options,
    transport: Arc<HttpTransport>,
    diagnostics: Diagnostics,
) -> Result<Box<dyn DownloadStrategy>, StrategyError> {
    let github = || -> Box<dyn DownloadStrategy> {
        Box::new(Instrumented::new(
            GitHubStrategy::new(
                Arc::clone(&transport),
                &options.github.api_url,
                &options.github.download_url,
                options.self_path.clone(),
            ),
            diagnostics,
        ))
    };
    let nuget = || -> Box<dyn DownloadStrategy> {
        Box::new(Instrumented::new(
            NugetStrategy::new(
                Arc::clone(&transport),
                options.nuget_source.clone(),
                options.self_path.clone(),
            ),
            diagnostics,
        ))
    };

    let sources = match options.sources {
        SourceOrder::GitHubFirst => vec![github(), nuget()],
        SourceOrder::NugetFirst => vec![nuget(), github()],
        SourceOrder::NugetOnly => vec![nuget()],
    };

    let members = if options.use_cache {
        sources
            .into_iter()
            .map(|source| -> Result<Box<dyn DownloadStrategy>, StrategyError> {
                let cached = CacheStrategy::new(source, Box::new(LocalFileSystem), &options.cache_dir)?;
                Ok(Box::new(Instrumented::new(cached, diagnostics)))
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        sources
    };

    let chain = FallbackChain::new(members)?;
    debug!("Using strategy {}", chain.name());
    Ok(Box::new(chain))
}

/// Resolve the requested version and install it, or update the bootstrapper itself.
pub async fn run(options: &Options, strategy: &dyn DownloadStrategy) -> Result<Outcome, BootstrapError> {
    if let Some(minutes) = options.max_file_age.filter(|_| !options.self_update) {
        if is_younger_than(&options.target, minutes)? {
            info!(
                "{} is younger than {} minute(s), skipping all checks.",
                options.target.display(),
                minutes
            );
            return Ok(Outcome::UpToDate);
        }
    }

    let version = match &options.version {
        VersionRequest::Exact(version) => version.clone(),
        VersionRequest::Latest { prerelease } => strategy.get_latest_version(!prerelease).await?,
    };

    if version.trim().is_empty() || version == "0" {
        return Err(BootstrapError::NoVersionAvailable);
    }

    if options.self_update {
        info!("Updating the bootstrapper to version {}.", version);
        strategy.self_update(&version).await?;
        return Ok(Outcome::SelfUpdated(version));
    }

    strategy.download_version(&version, &options.target).await?;
    info!("Paket {} is available at {}.", version, options.target.display());
    Ok(Outcome::Downloaded(version))
}

/// Log a failed run through the configured subscriber.
///
/// Returns whether the run succeeded, so the caller only has to pick an exit code.
pub fn report(result: Result<Outcome, BootstrapError>) -> bool {
    match result {
        Ok(outcome) => {
            debug!("Finished with {:?}", outcome);
            true
        }
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

fn is_younger_than(path: &Path, minutes: u64) -> io::Result<bool> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let modified: DateTime<Utc> = metadata.modified()?.into();
    let max_age = i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX);
    Ok(Utc::now().signed_duration_since(modified) < max_age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use crate::strategy::MockDownloadStrategy;
    use mockall::predicate::eq;
    use rstest::rstest;
    use tempfile::TempDir;

    fn options(dir: &Path) -> Options {
        Options {
            target: dir.join("paket.exe"),
            self_path: dir.join("paket.bootstrapper.exe"),
            version: VersionRequest::Latest { prerelease: false },
            sources: SourceOrder::GitHubFirst,
            nuget_source: NugetSource::default(),
            github: GitHubConfig::default(),
            max_file_age: None,
            self_update: false,
            use_cache: true,
            cache_dir: dir.join("cache"),
        }
    }

    #[rstest]
    #[case(SourceOrder::GitHubFirst, true, "GitHub - cached -> NuGet - cached")]
    #[case(SourceOrder::NugetFirst, true, "NuGet - cached -> GitHub - cached")]
    #[case(SourceOrder::NugetOnly, true, "NuGet - cached")]
    #[case(SourceOrder::GitHubFirst, false, "GitHub -> NuGet")]
    #[case(SourceOrder::NugetOnly, false, "NuGet")]
    fn build_strategy_orders_sources(
        #[case] sources: SourceOrder,
        #[case] use_cache: bool,
        #[case] expected: &str,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            sources,
            use_cache,
            ..options(temp_dir.path())
        };

        let strategy = build_strategy(
            &options,
            Arc::new(HttpTransport::direct()),
            Diagnostics::new(Verbosity::Normal),
        )
        .unwrap();

        assert_eq!(strategy.name(), expected);
        assert_eq!(strategy.has_fallback(), sources != SourceOrder::NugetOnly);
    }

    #[rstest]
    #[case(false, true)]
    #[case(true, false)]
    #[tokio::test]
    async fn run_downloads_latest_version(#[case] prerelease: bool, #[case] ignore_prerelease: bool) {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            version: VersionRequest::Latest { prerelease },
            ..options(temp_dir.path())
        };
        let target = options.target.clone();

        let mut strategy = MockDownloadStrategy::new();
        strategy
            .expect_get_latest_version()
            .with(eq(ignore_prerelease))
            .times(1)
            .returning(|_| Ok("5.258.1".to_string()));
        strategy
            .expect_download_version()
            .withf(move |version, path| version == "5.258.1" && path == target)
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = run(&options, &strategy).await.unwrap();

        assert_eq!(outcome, Outcome::Downloaded("5.258.1".to_string()));
    }

    #[tokio::test]
    async fn run_uses_exact_version_without_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            version: VersionRequest::Exact("5.100.0".to_string()),
            ..options(temp_dir.path())
        };

        let mut strategy = MockDownloadStrategy::new();
        strategy.expect_get_latest_version().times(0);
        strategy
            .expect_download_version()
            .withf(|version, _| version == "5.100.0")
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = run(&options, &strategy).await.unwrap();

        assert_eq!(outcome, Outcome::Downloaded("5.100.0".to_string()));
    }

    #[tokio::test]
    async fn run_fails_when_only_empty_cache_answers() {
        let temp_dir = TempDir::new().unwrap();
        let options = options(temp_dir.path());

        let mut strategy = MockDownloadStrategy::new();
        strategy
            .expect_get_latest_version()
            .returning(|_| Ok("0".to_string()));
        strategy.expect_download_version().times(0);

        let result = run(&options, &strategy).await;

        assert!(matches!(result, Err(BootstrapError::NoVersionAvailable)));
    }

    #[tokio::test]
    async fn run_self_update_skips_artifact_download() {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            self_update: true,
            max_file_age: Some(60),
            ..options(temp_dir.path())
        };
        std::fs::write(&options.target, "fresh").unwrap();

        let mut strategy = MockDownloadStrategy::new();
        strategy
            .expect_get_latest_version()
            .returning(|_| Ok("5.258.1".to_string()));
        strategy
            .expect_self_update()
            .withf(|version| version == "5.258.1")
            .times(1)
            .returning(|_| Ok(()));
        strategy.expect_download_version().times(0);

        let outcome = run(&options, &strategy).await.unwrap();

        assert_eq!(outcome, Outcome::SelfUpdated("5.258.1".to_string()));
    }

    #[tokio::test]
    async fn run_skips_checks_for_fresh_target() {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            max_file_age: Some(60),
            ..options(temp_dir.path())
        };
        std::fs::write(&options.target, "fresh").unwrap();

        let mut strategy = MockDownloadStrategy::new();
        strategy.expect_get_latest_version().times(0);
        strategy.expect_download_version().times(0);

        let outcome = run(&options, &strategy).await.unwrap();

        assert_eq!(outcome, Outcome::UpToDate);
    }

    #[tokio::test]
    async fn run_checks_again_when_target_is_too_old() {
        let temp_dir = TempDir::new().unwrap();
        let options = Options {
            max_file_age: Some(0),
            ..options(temp_dir.path())
        };
        std::fs::write(&options.target, "stale").unwrap();

        let mut strategy = MockDownloadStrategy::new();
        strategy
            .expect_get_latest_version()
            .times(1)
            .returning(|_| Ok("5.258.1".to_string()));
        strategy
            .expect_download_version()
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = run(&options, &strategy).await.unwrap();

        assert_eq!(outcome, Outcome::Downloaded("5.258.1".to_string()));
    }

    #[rstest]
    #[case(Ok(Outcome::UpToDate), true)]
    #[case(Ok(Outcome::Downloaded("5.258.1".to_string())), true)]
    #[case(Err(BootstrapError::NoVersionAvailable), false)]
    #[case(Err(BootstrapError::Strategy(StrategyError::NotFound("paket.exe".to_string()))), false)]
    fn report_tells_success_from_failure(
        #[case] result: Result<Outcome, BootstrapError>,
        #[case] expected: bool,
    ) {
        assert_eq!(report(result), expected);
    }

    #[tokio::test]
    async fn run_propagates_strategy_failure() {
        let temp_dir = TempDir::new().unwrap();
        let options = options(temp_dir.path());

        let mut strategy = MockDownloadStrategy::new();
        strategy
            .expect_get_latest_version()
            .returning(|_| Err(StrategyError::NotFound("releases".to_string())));

        let result = run(&options, &strategy).await;

        assert!(matches!(
            result,
            Err(BootstrapError::Strategy(StrategyError::NotFound(_)))
        ));
    }
}
