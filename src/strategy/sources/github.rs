//! GitHub Releases download strategy

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::{ARTIFACT_NAME, BOOTSTRAPPER_NAME};
use crate::strategy::DownloadStrategy;
use crate::strategy::error::StrategyError;
use crate::transport::HttpTransport;
use crate::version::semver::select_latest_release;

/// Releases requested per page; the newest releases come first
const RELEASES_PER_PAGE: u32 = 100;

/// Response from GitHub Releases API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Strategy backed by the release assets of the paket repository
pub struct GitHubStrategy {
    transport: Arc<HttpTransport>,
    api_url: String,
    download_url: String,
    self_path: PathBuf,
}

impl GitHubStrategy {
    /// `api_url` is the repository root of the releases API, `download_url`
    /// the root under which `<version>/<asset>` is served. Self-update
    /// replaces the file at `self_path`.
    pub fn new(
        transport: Arc<HttpTransport>,
        api_url: &str,
        download_url: &str,
        self_path: PathBuf,
    ) -> Self {
        Self {
            transport,
            api_url: api_url.trim_end_matches('/').to_string(),
            download_url: download_url.trim_end_matches('/').to_string(),
            self_path,
        }
    }

    fn asset_url(&self, version: &str, asset: &str) -> String {
        format!("{}/{}/{}", self.download_url, version, asset)
    }
}

#[async_trait::async_trait]
impl DownloadStrategy for GitHubStrategy {
    fn name(&self) -> String {
        "GitHub".to_string()
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        let url = format!("{}/releases?per_page={}", self.api_url, RELEASES_PER_PAGE);
        let releases: Vec<Release> = self.transport.get_json(&url).await?;
        debug!("GitHub lists {} releases", releases.len());

        select_latest_release(
            releases.into_iter().map(|release| release.tag_name),
            ignore_prerelease,
        )
        .ok_or_else(|| StrategyError::NotFound(format!("no usable release at {}", url)))
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        let url = self.asset_url(version, ARTIFACT_NAME);
        debug!("Downloading {} from {}", ARTIFACT_NAME, url);
        self.transport.download_file(&url, target).await
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        let url = self.asset_url(version, BOOTSTRAPPER_NAME);
        debug!("Downloading {} from {}", BOOTSTRAPPER_NAME, url);
        self.transport.download_file(&url, &self.self_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use tempfile::TempDir;

    fn strategy(server: &ServerGuard, self_path: PathBuf) -> GitHubStrategy {
        GitHubStrategy::new(
            Arc::new(HttpTransport::direct()),
            &format!("{}/repos/fsprojects/Paket", server.url()),
            &format!("{}/download/", server.url()),
            self_path,
        )
    }

    async fn releases(server: &mut ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/repos/fsprojects/Paket/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn get_latest_version_returns_highest_stable_tag() {
        let mut server = Server::new_async().await;
        let mock = releases(
            &mut server,
            r#"[
                {"tag_name": "6.0.0-alpha001"},
                {"tag_name": "5.258.1"},
                {"tag_name": "5.257.0"},
                {"tag_name": "nightly"}
            ]"#,
        )
        .await;

        let result = strategy(&server, PathBuf::from("unused"))
            .get_latest_version(true)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, "5.258.1");
    }

    #[tokio::test]
    async fn get_latest_version_includes_prerelease_when_allowed() {
        let mut server = Server::new_async().await;
        let mock = releases(
            &mut server,
            r#"[{"tag_name": "5.258.1"}, {"tag_name": "6.0.0-alpha001"}]"#,
        )
        .await;

        let result = strategy(&server, PathBuf::from("unused"))
            .get_latest_version(false)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, "6.0.0-alpha001");
    }

    #[tokio::test]
    async fn get_latest_version_returns_not_found_without_usable_release() {
        let mut server = Server::new_async().await;
        let mock = releases(&mut server, r#"[{"tag_name": "6.0.0-alpha001"}]"#).await;

        let result = strategy(&server, PathBuf::from("unused"))
            .get_latest_version(true)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_latest_version_returns_rate_limited_for_429() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/fsprojects/Paket/releases")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "60")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let result = strategy(&server, PathBuf::from("unused"))
            .get_latest_version(true)
            .await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(StrategyError::RateLimited {
                retry_after_secs: Some(60)
            })
        ));
    }

    #[tokio::test]
    async fn download_version_fetches_release_asset() {
        let mut server = Server::new_async().await;
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("paket.exe");

        let mock = server
            .mock("GET", "/download/5.258.1/paket.exe")
            .with_status(200)
            .with_body("paket 5.258.1")
            .create_async()
            .await;

        strategy(&server, PathBuf::from("unused"))
            .download_version("5.258.1", &target)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "paket 5.258.1");
    }

    #[tokio::test]
    async fn self_update_replaces_bootstrapper() {
        let mut server = Server::new_async().await;
        let temp_dir = TempDir::new().unwrap();
        let self_path = temp_dir.path().join("paket.bootstrapper.exe");
        std::fs::write(&self_path, "old bootstrapper").unwrap();

        let mock = server
            .mock("GET", "/download/5.258.1/paket.bootstrapper.exe")
            .with_status(200)
            .with_body("new bootstrapper")
            .create_async()
            .await;

        strategy(&server, self_path.clone())
            .self_update("5.258.1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            std::fs::read_to_string(&self_path).unwrap(),
            "new bootstrapper"
        );
    }
}
