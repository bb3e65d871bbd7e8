//! Artifact Installer
//!
//! Makes sure the chat executable and the model weights are cached locally,
//! fetching only what is missing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use reqwest::Client;

use super::downloader::{build_client, download_file, make_executable, ProgressReporter, TerminalProgress};
use super::paths::{CachePaths, SetupStatus};
use crate::error::{BridgeResult, DownloadError};

/// Something that can put the bytes at `url` into `dest`
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path, label: &str) -> Result<(), DownloadError>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    reporter: Arc<dyn ProgressReporter>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, DownloadError> {
        Ok(Self::with_reporter(build_client()?, Arc::new(TerminalProgress)))
    }

    pub fn with_reporter(client: Client, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { client, reporter }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path, label: &str) -> Result<(), DownloadError> {
        download_file(&self.client, url, dest, label, self.reporter.as_ref()).await?;
        Ok(())
    }
}

/// Upstream locations of both artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUrls {
    pub executable: String,
    pub model: String,
}

/// What `ensure` actually fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub executable_fetched: bool,
    pub model_fetched: bool,
}

impl InstallReport {
    pub fn fetched_any(&self) -> bool {
        self.executable_fetched || self.model_fetched
    }
}

pub struct Installer<F> {
    fetcher: F,
}

impl<F: Fetcher> Installer<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch whichever artifacts are missing (both when `force`).
    /// Downloads run concurrently; the first failure is returned.
    pub async fn ensure(
        &self,
        paths: &CachePaths,
        urls: &ArtifactUrls,
        force: bool,
    ) -> BridgeResult<InstallReport> {
        let status = SetupStatus::check(paths);
        let report = InstallReport {
            executable_fetched: force || !status.executable_ok,
            model_fetched: force || !status.model_ok,
        };

        if !report.fetched_any() {
            tracing::info!(root = %paths.root.display(), "Executable and model already cached");
            return Ok(report);
        }

        paths.ensure_directories()?;

        let mut jobs: Vec<BoxFuture<'_, Result<(), DownloadError>>> = Vec::new();

        if report.executable_fetched {
            jobs.push(
                async move {
                    self.fetcher
                        .fetch(&urls.executable, &paths.executable, "executable")
                        .await?;
                    make_executable(&paths.executable).await
                }
                .boxed(),
            );
        }

        if report.model_fetched {
            jobs.push(self.fetcher.fetch(&urls.model, &paths.model, "model"));
        }

        try_join_all(jobs).await?;

        tracing::info!(
            executable = report.executable_fetched,
            model = report.model_fetched,
            "Setup complete"
        );
        Ok(report)
    }
}
