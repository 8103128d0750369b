//! Outbound HTTP requests with fixed request shaping

use std::path::Path;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::USER_AGENT;
use crate::strategy::error::StrategyError;
use crate::transport::files::{replace_file, temp_file_in};
use crate::transport::proxy::ProxyResolver;

/// Sends every request with the bootstrapper user agent, gzip/deflate
/// decompression and the proxy resolved for its URL.
pub struct HttpTransport {
    proxies: ProxyResolver,
}

impl HttpTransport {
    pub fn new(proxies: ProxyResolver) -> Self {
        Self { proxies }
    }

    /// Transport that never uses a proxy
    pub fn direct() -> Self {
        Self::new(ProxyResolver::direct())
    }

    fn client_for(&self, url: &Url) -> Result<Client, StrategyError> {
        let builder = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .deflate(true);

        let builder = match self.proxies.resolve(url) {
            Some(proxy) => builder.proxy(proxy.into_proxy()),
            None => builder.no_proxy(),
        };

        Ok(builder.build()?)
    }

    async fn get(&self, url: &str) -> Result<Response, StrategyError> {
        let parsed = Url::parse(url)
            .map_err(|e| StrategyError::Configuration(format!("Invalid URL '{}': {}", url, e)))?;

        debug!("GET {}", parsed);
        let response = self.client_for(&parsed)?.get(parsed).send().await?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(StrategyError::NotFound(url.to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(StrategyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("Request returned status {}: {}", status, url);
            return Err(StrategyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    /// GET `url` and deserialize the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, StrategyError> {
        self.get(url).await?.json().await.map_err(|e| {
            warn!("Failed to parse response from {}: {}", url, e);
            StrategyError::InvalidResponse(e.to_string())
        })
    }

    /// GET `url` and return the raw body
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, StrategyError> {
        let bytes = self.get(url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Download `url` to `target`, replacing any existing file.
    ///
    /// The body goes to a temporary file next to `target` first, so a failed
    /// transfer leaves `target` untouched.
    pub async fn download_file(&self, url: &str, target: &Path) -> Result<(), StrategyError> {
        let bytes = self.get_bytes(url).await?;
        write_replacing(target, &bytes).await?;

        debug!("Downloaded {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

/// Write `contents` to a temporary file beside `target`, then move it over `target`.
pub async fn write_replacing(target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(dir).await?;

    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let temp = temp_file_in(dir, &name)?;
    tokio::fs::write(&temp, contents).await?;

    replace_file(&temp, target)
}
