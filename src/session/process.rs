//! Chat Process Session
//!
//! One spawned chat executable, from spawn to kill. The session owns the
//! child and both pipes; dropping it kills the child.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::framing::FramingConfig;
use super::reader::ResponseReader;
use crate::config::DecoderConfig;
use crate::error::SessionError;

/// Windows flag to prevent console window from appearing
#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// `--model <path>` followed by the decoder flags
pub fn build_args(model_path: &Path, decoder: &DecoderConfig) -> Vec<OsString> {
    let mut args = vec![OsString::from("--model"), model_path.as_os_str().to_os_string()];
    args.extend(decoder.to_args().into_iter().map(OsString::from));
    args
}

/// A running chat executable.
///
/// `prompt` takes `&mut self`: the pipe is not multiplexed, so only one
/// request may be outstanding at a time.
pub struct ChatSession {
    child: Child,
    stdin: ChildStdin,
    reader: ResponseReader<ChildStdout>,
}

impl ChatSession {
    /// Spawn the executable and wait until it prints its first prompt
    pub async fn spawn(
        executable: &Path,
        model_path: &Path,
        decoder: &DecoderConfig,
        framing: FramingConfig,
    ) -> Result<Self, SessionError> {
        let args = build_args(model_path, decoder);
        tracing::info!(executable = %executable.display(), model = %model_path.display(), ?args, "Starting chat process");

        let mut cmd = Command::new(executable);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Hide console window on Windows
        #[cfg(target_os = "windows")]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionError::spawn_failed(format!("Failed to start {}: {}", executable.display(), e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::spawn_failed("Failed to get child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::spawn_failed("Failed to get child stdout"))?;

        let mut session = Self {
            child,
            stdin,
            reader: ResponseReader::new(stdout, framing),
        };

        match session.reader.wait_ready().await {
            Ok(banner) => {
                tracing::info!(pid = ?session.id(), banner_len = banner.len(), "Chat process ready");
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("Chat process never became ready: {}", e);
                session.close().await;
                Err(e)
            }
        }
    }

    /// OS process id, `None` once the child has been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Send one prompt line and read the response
    pub async fn prompt(&mut self, prompt: &str) -> Result<String, SessionError> {
        tracing::debug!(len = prompt.len(), "Sending prompt");

        let line = format!("{}\n", prompt);
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::stream(format!("Failed to write to child: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| SessionError::stream(format!("Failed to flush: {}", e)))?;

        let response = self.reader.read_response().await?;
        tracing::debug!(len = response.len(), "Received response");
        Ok(response)
    }

    /// Kill the child and reap it
    pub async fn close(mut self) {
        let pid = self.id();
        if let Err(e) = self.child.kill().await {
            // Already exited on its own
            tracing::debug!(?pid, "Kill failed: {}", e);
        }
        tracing::info!(?pid, "Chat process closed");
    }
}
