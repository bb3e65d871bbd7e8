//! GPT4All Wrapper
//!
//! Owns setup and at most one chat session:
//! `new -> init -> open -> prompt* -> close`.

use crate::config::Gpt4AllConfig;
use crate::error::{BridgeError, BridgeResult, SessionError};
use crate::hardware::{detect_platform, Platform};
use crate::models::SupportedModel;
use crate::session::ChatSession;
use crate::setup::{ArtifactUrls, CachePaths, Fetcher, HttpFetcher, InstallReport, Installer, SetupStatus};

pub struct Gpt4All<F = HttpFetcher> {
    config: Gpt4AllConfig,
    platform: Platform,
    paths: CachePaths,
    installer: Installer<F>,
    session: Option<ChatSession>,
}

impl Gpt4All<HttpFetcher> {
    /// Validate the host platform and resolve cache paths.
    /// Touches neither the filesystem nor the network.
    pub fn new(config: Gpt4AllConfig) -> BridgeResult<Self> {
        let platform = detect_platform()?;
        let fetcher = HttpFetcher::new()?;
        Ok(Self::with_parts(config, platform, fetcher))
    }

    /// Same as `new`, taking the model by name
    pub fn from_model_name(name: &str) -> BridgeResult<Self> {
        let model: SupportedModel = name.parse()?;
        Self::new(Gpt4AllConfig::with_model(model))
    }
}

impl<F: Fetcher> Gpt4All<F> {
    pub fn with_parts(config: Gpt4AllConfig, platform: Platform, fetcher: F) -> Self {
        let paths = CachePaths::resolve(config.cache_dir.clone(), platform, config.model);
        tracing::debug!(
            model = %config.model,
            platform = platform.as_str(),
            root = %paths.root.display(),
            "Resolved cache paths"
        );
        Self {
            config,
            platform,
            paths,
            installer: Installer::new(fetcher),
            session: None,
        }
    }

    pub fn config(&self) -> &Gpt4AllConfig {
        &self.config
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Download whatever is missing from the cache.
    /// `force` (or `force_download` in the config) re-fetches both files.
    pub async fn init(&self, force: bool) -> BridgeResult<InstallReport> {
        let urls = ArtifactUrls {
            executable: self.platform.executable_url(),
            model: self.config.model.weights_url(),
        };
        self.installer
            .ensure(&self.paths, &urls, force || self.config.force_download)
            .await
    }

    /// Start the chat process, replacing any session already running
    pub async fn open(&mut self) -> BridgeResult<()> {
        self.close().await;

        let status = SetupStatus::check(&self.paths);
        if !status.is_complete() {
            let missing = if status.executable_ok {
                &self.paths.model
            } else {
                &self.paths.executable
            };
            return Err(BridgeError::FileSystem(format!(
                "{} is missing, call init() first",
                missing.display()
            )));
        }

        let session = ChatSession::spawn(
            &self.paths.executable,
            &self.paths.model,
            &self.config.decoder,
            self.config.framing.clone(),
        )
        .await?;

        self.session = Some(session);
        Ok(())
    }

    /// Send one prompt and wait for the response.
    ///
    /// Not safe to call concurrently: `&mut self` keeps one request in
    /// flight per wrapper.
    pub async fn prompt(&mut self, prompt: &str) -> BridgeResult<String> {
        let session = self.session.as_mut().ok_or_else(SessionError::not_open)?;
        Ok(session.prompt(prompt).await?)
    }

    /// Kill the chat process if one is running
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}
