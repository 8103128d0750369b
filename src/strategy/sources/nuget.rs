//! NuGet download strategy
//!
//! The source is either a NuGet v2 feed or a local directory of `.nupkg`
//! files. Executables are extracted from the package's `tools/` folder.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{
    ARTIFACT_NAME, BOOTSTRAPPER_NAME, BOOTSTRAPPER_PACKAGE_ID, DEFAULT_NUGET_SOURCE,
    PAKET_PACKAGE_ID,
};
use crate::strategy::DownloadStrategy;
use crate::strategy::error::StrategyError;
use crate::transport::HttpTransport;
use crate::transport::client::write_replacing;
use crate::version::semver::select_latest_release;

const PACKAGE_EXTENSION: &str = ".nupkg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NugetSource {
    /// Base URL of a NuGet v2 feed
    Feed(String),
    /// Directory holding `<id>.<version>.nupkg` files
    Directory(PathBuf),
}

impl NugetSource {
    /// Anything that is not an http(s) URL is treated as a directory.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::Feed(source.trim_end_matches('/').to_string())
        } else {
            Self::Directory(PathBuf::from(source))
        }
    }
}

impl Default for NugetSource {
    fn default() -> Self {
        Self::Feed(DEFAULT_NUGET_SOURCE.to_string())
    }
}

pub struct NugetStrategy {
    transport: Arc<HttpTransport>,
    source: NugetSource,
    self_path: PathBuf,
}

impl NugetStrategy {
    pub fn new(transport: Arc<HttpTransport>, source: NugetSource, self_path: PathBuf) -> Self {
        Self {
            transport,
            source,
            self_path,
        }
    }

    async fn available_versions(&self) -> Result<Vec<String>, StrategyError> {
        match &self.source {
            NugetSource::Feed(feed) => {
                let url = format!(
                    "{}/package-versions/{}?includePrerelease=true",
                    feed, PAKET_PACKAGE_ID
                );
                self.transport.get_json(&url).await
            }
            NugetSource::Directory(dir) => local_package_versions(dir, PAKET_PACKAGE_ID),
        }
    }

    async fn fetch_package(&self, package_id: &str, version: &str) -> Result<Vec<u8>, StrategyError> {
        match &self.source {
            NugetSource::Feed(feed) => {
                let url = format!("{}/package/{}/{}", feed, package_id, version);
                debug!("Downloading package from {}", url);
                self.transport.get_bytes(&url).await
            }
            NugetSource::Directory(dir) => {
                let path = dir.join(format!("{}.{}{}", package_id, version, PACKAGE_EXTENSION));
                debug!("Reading package {}", path.display());
                tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        StrategyError::NotFound(path.display().to_string())
                    }
                    _ => StrategyError::Io(e),
                })
            }
        }
    }

    async fn install(
        &self,
        package_id: &str,
        version: &str,
        executable: &str,
        target: &Path,
    ) -> Result<(), StrategyError> {
        let package = self.fetch_package(package_id, version).await?;
        let contents = extract_tool(&package, executable)?;
        write_replacing(target, &contents).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DownloadStrategy for NugetStrategy {
    fn name(&self) -> String {
        "NuGet".to_string()
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        let versions = self.available_versions().await?;
        debug!("NuGet source lists {} versions", versions.len());

        select_latest_release(versions, ignore_prerelease)
            .ok_or_else(|| StrategyError::NotFound(format!("no usable {} package", PAKET_PACKAGE_ID)))
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        self.install(PAKET_PACKAGE_ID, version, ARTIFACT_NAME, target)
            .await
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        self.install(BOOTSTRAPPER_PACKAGE_ID, version, BOOTSTRAPPER_NAME, &self.self_path)
            .await
    }
}

/// Versions of `package_id` found as `<id>.<version>.nupkg` in `dir`
fn local_package_versions(dir: &Path, package_id: &str) -> Result<Vec<String>, StrategyError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StrategyError::NotFound(dir.display().to_string()),
        _ => StrategyError::Io(e),
    })?;

    let prefix = format!("{}.", package_id.to_ascii_lowercase());
    let mut versions = Vec::new();

    for entry in entries {
        let file_name = entry?.file_name().to_string_lossy().into_owned();
        let lower = file_name.to_ascii_lowercase();
        let version = lower
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(PACKAGE_EXTENSION))
            .filter(|version| !version.is_empty());

        // Lowercasing ASCII keeps byte offsets, so the original casing can be sliced.
        if let Some(version) = version {
            versions.push(file_name[prefix.len()..prefix.len() + version.len()].to_string());
        }
    }

    Ok(versions)
}

/// Contents of `tools/<executable>` in a package, matched case-insensitively
fn extract_tool(package: &[u8], executable: &str) -> Result<Vec<u8>, StrategyError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(package))
        .map_err(|e| StrategyError::Archive(format!("Failed to open package: {}", e)))?;

    let wanted = format!("tools/{}", executable).to_ascii_lowercase();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| StrategyError::Archive(format!("Failed to read package entry: {}", e)))?;

        if file.name().replace('\\', "/").to_ascii_lowercase() == wanted {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
    }

    Err(StrategyError::Archive(format!(
        "'{}' not found in package",
        wanted
    )))
}
