//! Bridge Error Types
//!
//! Centralized error handling for setup, download and session operations.

use std::fmt;

/// Main error type for bridge operations
#[derive(Debug)]
pub enum BridgeError {
    /// Requested model is not one of the supported variants
    UnsupportedModel(String),
    /// Host OS/architecture has no upstream executable
    UnsupportedPlatform { os: String, arch: String },
    /// Download errors (network, write, bad status)
    Download(DownloadError),
    /// Child process / stream errors
    Session(SessionError),
    /// File system errors
    FileSystem(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::UnsupportedModel(name) => write!(
                f,
                "Model {} is not supported. Current models supported are: {}",
                name,
                crate::models::SupportedModel::ALL
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            BridgeError::UnsupportedPlatform { os, arch } => write!(
                f,
                "Your platform is not supported: {} ({}). Current binaries supported are for OSX (ARM and Intel), Linux x86_64 and Windows x86_64.",
                os, arch
            ),
            BridgeError::Download(e) => write!(f, "Download Error: {}", e),
            BridgeError::Session(e) => write!(f, "Session Error: {}", e),
            BridgeError::FileSystem(msg) => write!(f, "File System Error: {}", msg),
            BridgeError::Config(msg) => write!(f, "Config Error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Download error types
#[derive(Debug)]
pub enum DownloadError {
    Network(String),
    Io(String),
    InvalidResponse(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Network(e) => write!(f, "Network error: {}", e),
            DownloadError::Io(e) => write!(f, "IO error: {}", e),
            DownloadError::InvalidResponse(e) => write!(f, "Invalid response: {}", e),
        }
    }
}

/// Child process / stream errors
#[derive(Debug)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// Prompt issued with no active session
    NotOpen,
    SpawnFailed,
    /// Child never printed its prompt marker
    NotReady,
    /// Child closed its output before answering
    ProcessExited,
    /// Read/write failure on the child's pipes
    Stream,
    Timeout,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl SessionError {
    pub fn not_open() -> Self {
        Self {
            kind: SessionErrorKind::NotOpen,
            message: "Bot is not initialized.".into(),
        }
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::SpawnFailed,
            message: message.into(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::NotReady,
            message: message.into(),
        }
    }

    pub fn process_exited(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::ProcessExited,
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Stream,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::Timeout,
            message: message.into(),
        }
    }
}

impl BridgeError {
    /// Session error kind, if this is a session error
    pub fn session_kind(&self) -> Option<SessionErrorKind> {
        match self {
            BridgeError::Session(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl From<DownloadError> for BridgeError {
    fn from(err: DownloadError) -> Self {
        BridgeError::Download(err)
    }
}

impl From<SessionError> for BridgeError {
    fn from(err: SessionError) -> Self {
        BridgeError::Session(err)
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::FileSystem(err.to_string())
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
