//! Path utilities for setup locations
//!
//! All files are stored in ~/.nomic/ unless a cache directory is configured.

use std::path::{Path, PathBuf};

use crate::hardware::Platform;
use crate::models::SupportedModel;

/// Get the default cache directory: ~/.nomic
pub fn default_cache_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".nomic")
}

/// Where an in-flight download is written before the final rename
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Resolved locations of the cached executable and model weights
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    pub root: PathBuf,
    pub executable: PathBuf,
    pub model: PathBuf,
}

impl CachePaths {
    pub fn resolve(root: Option<PathBuf>, platform: Platform, model: SupportedModel) -> Self {
        let root = root.unwrap_or_else(default_cache_dir);
        Self {
            executable: root.join(platform.executable_name()),
            model: root.join(model.file_name()),
            root,
        }
    }

    /// Ensure the cache directory exists
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

/// Which cached files are already present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupStatus {
    pub executable_ok: bool,
    pub model_ok: bool,
}

impl SetupStatus {
    pub fn check(paths: &CachePaths) -> Self {
        SetupStatus {
            executable_ok: paths.executable.is_file(),
            model_ok: paths.model.is_file(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.executable_ok && self.model_ok
    }
}
