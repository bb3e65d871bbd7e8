//! Setup Module
//!
//! Handles downloading the chat executable and model weights into the cache.

pub mod downloader;
pub mod installer;
pub mod paths;

pub use installer::{ArtifactUrls, Fetcher, HttpFetcher, InstallReport, Installer};
pub use paths::{CachePaths, SetupStatus};
