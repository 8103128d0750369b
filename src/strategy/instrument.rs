//! Timing and trace middleware applied to every strategy operation

use std::future::Future;
use std::path::Path;
use std::time::Instant;

use tracing::trace;

use crate::logging::Diagnostics;
use crate::strategy::DownloadStrategy;
use crate::strategy::error::StrategyError;

/// Rendering of an operation's result in trace output
pub trait TraceValue {
    fn trace_value(&self) -> String;
}

impl TraceValue for String {
    fn trace_value(&self) -> String {
        self.clone()
    }
}

impl TraceValue for () {
    fn trace_value(&self) -> String {
        "void".to_string()
    }
}

/// Run `operation`, timing and tracing it when tracing is enabled.
///
/// With tracing disabled the future is awaited directly. Failures are
/// traced with their message and returned unchanged.
pub async fn traced<T, F>(
    diagnostics: &Diagnostics,
    strategy: &str,
    action: &str,
    operation: F,
) -> Result<T, StrategyError>
where
    T: TraceValue,
    F: Future<Output = Result<T, StrategyError>>,
{
    if !diagnostics.trace_enabled() {
        return operation.await;
    }

    trace!("[{}] {}...", strategy, action);
    let started = Instant::now();
    let result = operation.await;
    let elapsed = started.elapsed().as_secs_f64();

    match &result {
        Ok(value) => trace!(
            "[{}] {} took {:.2} second(s) and returned {}.",
            strategy,
            action,
            elapsed,
            value.trace_value()
        ),
        Err(e) => trace!(
            "[{}] {} took {:.2} second(s) and failed with {}.",
            strategy, action, elapsed, e
        ),
    }

    result
}

/// Wraps any strategy so that each of its operations goes through [`traced`].
pub struct Instrumented<S> {
    inner: S,
    diagnostics: Diagnostics,
}

impl<S: DownloadStrategy> Instrumented<S> {
    pub fn new(inner: S, diagnostics: Diagnostics) -> Self {
        Self { inner, diagnostics }
    }
}

#[async_trait::async_trait]
impl<S: DownloadStrategy> DownloadStrategy for Instrumented<S> {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn has_fallback(&self) -> bool {
        self.inner.has_fallback()
    }

    fn link_fallback(&mut self) {
        self.inner.link_fallback()
    }

    async fn get_latest_version(&self, ignore_prerelease: bool) -> Result<String, StrategyError> {
        let name = self.inner.name();
        traced(
            &self.diagnostics,
            &name,
            "GetLatestVersion",
            self.inner.get_latest_version(ignore_prerelease),
        )
        .await
    }

    async fn download_version(&self, version: &str, target: &Path) -> Result<(), StrategyError> {
        let name = self.inner.name();
        traced(
            &self.diagnostics,
            &name,
            "DownloadVersion",
            self.inner.download_version(version, target),
        )
        .await
    }

    async fn self_update(&self, version: &str) -> Result<(), StrategyError> {
        let name = self.inner.name();
        traced(
            &self.diagnostics,
            &name,
            "SelfUpdate",
            self.inner.self_update(version),
        )
        .await
    }
}
