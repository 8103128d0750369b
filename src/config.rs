use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// =============================================================================
// Artifact and source constants
// =============================================================================

/// File name of the downloaded artifact, both at the target and in the cache
pub const ARTIFACT_NAME: &str = "paket.exe";

/// File name of the bootstrapper itself, used by self-update
pub const BOOTSTRAPPER_NAME: &str = "paket.bootstrapper.exe";

/// User agent sent with every request
pub const USER_AGENT: &str = "Paket.Bootstrapper";

/// NuGet package id of the artifact
pub const PAKET_PACKAGE_ID: &str = "Paket";

/// NuGet package id of the bootstrapper
pub const BOOTSTRAPPER_PACKAGE_ID: &str = "Paket.Bootstrapper";

pub const DEFAULT_NUGET_SOURCE: &str = "https://www.nuget.org/api/v2";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/repos/fsprojects/Paket";

pub const DEFAULT_GITHUB_DOWNLOAD_URL: &str = "https://github.com/fsprojects/Paket/releases/download";

/// Optional configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "paket.bootstrapper.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Bootstrapper configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapConfig {
    /// Consult NuGet before GitHub
    pub prefer_nuget: bool,
    /// Consult NuGet only
    pub force_nuget: bool,
    /// NuGet feed URL or local directory of packages
    pub nuget_source: Option<String>,
    /// Accept prerelease versions as latest
    pub prerelease: bool,
    /// Skip all checks when the target is younger than this many minutes
    pub max_file_age: Option<u64>,
    /// Override of the version cache directory
    pub cache_dir: Option<PathBuf>,
    /// Proxy configured for this host, used when no environment proxy applies
    pub proxy: Option<String>,
    /// Additional JSON log file
    pub log_file: Option<PathBuf>,
    pub github: GitHubConfig,
}

/// GitHub source locations
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubConfig {
    /// Repository root of the releases API
    pub api_url: String,
    /// Root of the release asset downloads
    pub download_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            download_url: DEFAULT_GITHUB_DOWNLOAD_URL.to_string(),
        }
    }
}

/// Load configuration from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<BootstrapConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(BootstrapConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the directory holding one subdirectory per cached version.
/// Uses <local app data>/NuGet/Cache/Paket, or ./NuGet/Cache/Paket if no
/// local data directory is available.
pub fn cache_dir() -> PathBuf {
    cache_dir_with(dirs::data_local_dir())
}

fn cache_dir_with(local_data_dir: Option<PathBuf>) -> PathBuf {
    local_data_dir
        .unwrap_or_else(|| PathBuf::from("."))
        .join("NuGet")
        .join("Cache")
        .join("Paket")
}
