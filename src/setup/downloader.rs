//! File Downloader
//!
//! Streams an HTTP GET into `<dest>.part`, reporting bytes received against
//! the declared `Content-Length`, then renames into place. No retry.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::paths::part_path;
use crate::error::DownloadError;

const BAR_WIDTH: usize = 20;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Download progress information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub label: String,
    pub percent: f64,
    pub eta_seconds: u64,
    pub downloaded_bytes: u64,
    /// `None` when the server declared no length
    pub total_bytes: Option<u64>,
    pub state: DownloadState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Downloading,
    Completed,
}

/// Receives progress updates during a download
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &DownloadProgress);
}

/// `label [====      ]  42% 12s` on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress;

impl TerminalProgress {
    pub fn render(progress: &DownloadProgress) -> String {
        match progress.total_bytes {
            Some(_) => {
                let filled = ((progress.percent / 100.0) * BAR_WIDTH as f64).round() as usize;
                let filled = filled.min(BAR_WIDTH);
                format!(
                    "{} [{}{}] {:>3.0}% {}s",
                    progress.label,
                    "=".repeat(filled),
                    " ".repeat(BAR_WIDTH - filled),
                    progress.percent,
                    progress.eta_seconds
                )
            }
            None => format!("{} {} bytes", progress.label, progress.downloaded_bytes),
        }
    }
}

impl ProgressReporter for TerminalProgress {
    fn report(&self, progress: &DownloadProgress) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", Self::render(progress));
        if progress.state == DownloadState::Completed {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

/// Progress goes to the trace log only
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, progress: &DownloadProgress) {
        tracing::trace!(
            label = %progress.label,
            downloaded = progress.downloaded_bytes,
            total = ?progress.total_bytes,
            "Download progress"
        );
    }
}

fn progress_for(
    label: &str,
    downloaded_bytes: u64,
    total_bytes: Option<u64>,
    elapsed: Duration,
    state: DownloadState,
) -> DownloadProgress {
    let percent = match total_bytes {
        Some(total) if total > 0 => ((downloaded_bytes as f64 / total as f64) * 100.0).min(100.0),
        _ if state == DownloadState::Completed => 100.0,
        _ => 0.0,
    };

    let elapsed = elapsed.as_secs_f64();
    let speed_bps = if elapsed > 0.0 { downloaded_bytes as f64 / elapsed } else { 0.0 };
    let eta_seconds = match total_bytes {
        Some(total) if speed_bps > 0.0 => (total.saturating_sub(downloaded_bytes) as f64 / speed_bps) as u64,
        _ => 0,
    };

    DownloadProgress {
        label: label.to_string(),
        percent,
        eta_seconds,
        downloaded_bytes,
        total_bytes,
        state,
    }
}

/// Build the HTTP client used for artifact downloads
pub fn build_client() -> Result<Client, DownloadError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .user_agent(concat!("gpt4all-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DownloadError::Network(e.to_string()))
}

/// Download a file with progress reporting. Returns the number of bytes written.
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn ProgressReporter,
) -> Result<u64, DownloadError> {
    tracing::info!(url, dest = %dest.display(), "Starting download");

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::Io(e.to_string()))?;
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::InvalidResponse(format!(
            "HTTP {}: {}",
            status,
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    let total_bytes = response.content_length();
    let temp = part_path(dest);
    let mut file = File::create(&temp)
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;

    let start_time = Instant::now();
    let mut last_progress_time = start_time;
    let mut downloaded_bytes: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::Network(e.to_string()))?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::Io(e.to_string()))?;

        downloaded_bytes += chunk.len() as u64;

        // Report every 100ms to avoid spam
        if last_progress_time.elapsed() >= PROGRESS_INTERVAL {
            last_progress_time = Instant::now();
            reporter.report(&progress_for(
                label,
                downloaded_bytes,
                total_bytes,
                start_time.elapsed(),
                DownloadState::Downloading,
            ));
        }
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;
    drop(file);

    if let Some(total) = total_bytes {
        if downloaded_bytes < total {
            return Err(DownloadError::Network(format!(
                "Connection closed after {} of {} bytes",
                downloaded_bytes, total
            )));
        }
    }

    tokio::fs::rename(&temp, dest)
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;

    reporter.report(&progress_for(
        label,
        downloaded_bytes,
        total_bytes,
        start_time.elapsed(),
        DownloadState::Completed,
    ));

    tracing::info!(
        bytes = downloaded_bytes,
        secs = start_time.elapsed().as_secs_f64(),
        "File downloaded successfully to {}",
        dest.display()
    );

    Ok(downloaded_bytes)
}

/// Mark a downloaded executable as runnable (0o755)
pub async fn make_executable(path: &Path) -> Result<(), DownloadError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| DownloadError::Io(e.to_string()))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_and_eta() {
        let p = progress_for("model", 50, Some(200), Duration::from_secs(5), DownloadState::Downloading);
        assert_eq!(p.percent, 25.0);
        // 10 B/s, 150 bytes left
        assert_eq!(p.eta_seconds, 15);
    }

    #[test]
    fn test_progress_unknown_length() {
        let p = progress_for("model", 50, None, Duration::from_secs(1), DownloadState::Downloading);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.eta_seconds, 0);
        assert_eq!(TerminalProgress::render(&p), "model 50 bytes");

        let done = progress_for("model", 50, None, Duration::from_secs(1), DownloadState::Completed);
        assert_eq!(done.percent, 100.0);
    }

    #[test]
    fn test_render_bar() {
        let p = progress_for("exe", 50, Some(100), Duration::from_secs(1), DownloadState::Downloading);
        assert_eq!(TerminalProgress::render(&p), "exe [==========          ]  50% 1s");

        let p = progress_for("exe", 100, Some(100), Duration::from_secs(1), DownloadState::Completed);
        assert_eq!(TerminalProgress::render(&p), "exe [====================] 100% 0s");
    }

    /// Serve one canned HTTP/1.1 response on 127.0.0.1, then hang up
    async fn serve_once(response: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/artifact.bin", addr)
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn test_download_file_renames_into_place() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\nhello world").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("model.bin");

        let bytes = download_file(&local_client(), &url, &dest, "model", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(bytes, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_file_rejects_error_status() {
        let url = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("model.bin");

        let err = download_file(&local_client(), &url, &dest, "model", &SilentProgress)
            .await
            .unwrap_err();

        match err {
            DownloadError::InvalidResponse(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_file_truncated_body_is_not_cached() {
        let url = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nonly ten b").await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("model.bin");

        let err = download_file(&local_client(), &url, &dest, "model", &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Network(_)));
        assert!(!dest.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_make_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        make_executable(&path).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
