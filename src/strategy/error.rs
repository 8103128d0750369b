use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid strategy configuration: {0}")]
    Configuration(String),
}

impl StrategyError {
    /// Whether the failure belongs to the transient network class.
    ///
    /// Only these failures move a fallback chain on to its next strategy or
    /// let a terminal caching strategy answer from its local cache.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RateLimited { .. }
                | Self::NotFound(_)
                | Self::UnexpectedStatus { .. }
        )
    }
}
