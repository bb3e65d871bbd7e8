//! Response Reader
//!
//! Turns the child's raw output stream into readiness and response events.
//! Generic over the byte stream so framing can be exercised without a child.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use super::framing::{FramingConfig, ResponseDetector, Utf8Decoder};
use crate::error::SessionError;

const READ_BUF_SIZE: usize = 4096;

pub struct ResponseReader<R> {
    stream: R,
    decoder: Utf8Decoder,
    framing: FramingConfig,
    detector: Box<dyn ResponseDetector>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> ResponseReader<R> {
    pub fn new(stream: R, framing: FramingConfig) -> Self {
        let detector = framing.detector();
        Self {
            stream,
            decoder: Utf8Decoder::new(),
            framing,
            detector,
            buf: vec![0; READ_BUF_SIZE],
        }
    }

    /// Replace the end-of-response predicate.
    ///
    /// The detector also cleans up finished responses, so a custom one owns
    /// marker stripping too. `framing.marker` still decides readiness.
    pub fn with_detector(mut self, detector: Box<dyn ResponseDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn framing(&self) -> &FramingConfig {
        &self.framing
    }

    /// Next decoded chunk, `None` at end of stream
    async fn next_chunk(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            let n = self
                .stream
                .read(&mut self.buf)
                .await
                .map_err(|e| SessionError::stream(format!("Failed to read from child: {}", e)))?;

            if n == 0 {
                let tail = self.decoder.finish();
                return Ok(if tail.is_empty() { None } else { Some(tail) });
            }

            let text = self.decoder.decode(&self.buf[..n]);
            // A lone partial UTF-8 sequence decodes to nothing yet
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }

    /// Wait for the child's first prompt marker.
    ///
    /// Returns the banner printed before it. With the marker disabled, any
    /// output counts as ready.
    pub async fn wait_ready(&mut self) -> Result<String, SessionError> {
        match self.framing.ready_timeout() {
            Some(limit) => timeout(limit, self.read_until_ready())
                .await
                .map_err(|_| SessionError::timeout(format!("Child not ready after {:?}", limit)))?,
            None => self.read_until_ready().await,
        }
    }

    async fn read_until_ready(&mut self) -> Result<String, SessionError> {
        let mut banner = String::new();
        loop {
            let Some(chunk) = self.next_chunk().await? else {
                return Err(SessionError::not_ready(
                    "Child closed its output before printing a prompt",
                ));
            };
            banner.push_str(&chunk);

            let ready = match self.framing.marker {
                Some(marker) => banner.contains(marker),
                None => true,
            };
            if ready {
                return Ok(banner);
            }
        }
    }

    /// Read one response.
    ///
    /// Ends on the detector (explicit) or after `idle_timeout` with no new
    /// chunk (implicit). The idle clock starts with the first chunk; before
    /// that the wait is bounded only by `first_output_timeout`.
    ///
    /// A prompt redrawn after the previous turn already ended on the idle
    /// timeout is discarded, and the wait for this turn's answer starts over.
    pub async fn read_response(&mut self) -> Result<String, SessionError> {
        let idle = self.framing.idle_timeout();
        let mut response = String::new();

        loop {
            let next = if response.is_empty() {
                self.first_chunk().await?
            } else {
                match timeout(idle, self.next_chunk()).await {
                    Err(_) => {
                        tracing::debug!(idle_ms = idle.as_millis() as u64, "Idle timeout, treating response as complete");
                        break;
                    }
                    Ok(next) => next?,
                }
            };

            let Some(chunk) = next else {
                if response.is_empty() {
                    return Err(SessionError::process_exited(
                        "Child closed its output before responding",
                    ));
                }
                tracing::debug!("Child output closed mid-response");
                break;
            };

            response.push_str(&chunk);
            if self.detector.is_complete(&chunk, &response) {
                if self.detector.is_leftover(&response) {
                    tracing::debug!("Dropping prompt left over from the previous turn");
                    response.clear();
                    continue;
                }
                tracing::debug!(len = response.len(), "Response ended on marker");
                break;
            }
        }

        Ok(self.detector.finalize(&response))
    }

    async fn first_chunk(&mut self) -> Result<Option<String>, SessionError> {
        match self.framing.first_output_timeout() {
            Some(limit) => timeout(limit, self.next_chunk())
                .await
                .map_err(|_| SessionError::timeout(format!("No output after {:?}", limit)))?,
            None => self.next_chunk().await,
        }
    }
}

