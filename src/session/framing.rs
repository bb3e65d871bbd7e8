//! Response Framing
//!
//! The chat executable prints free text and redraws its interactive prompt
//! (`>`) when a turn is over. Two things end a response:
//! - the [`ResponseDetector`] reports completion (explicit end), or
//! - no output arrives for `idle_timeout` (implicit end).
//!
//! The prompt character doubles as a delimiter, so a `>` inside genuine model
//! output ends the response early. Set `marker` to `None` to rely on the idle
//! timeout alone.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKER: char = '>';
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 4000;

/// Decides whether the accumulated output is a complete response
pub trait ResponseDetector: Send + Sync {
    /// `chunk` is the text just read; `accumulated` already includes it
    fn is_complete(&self, chunk: &str, accumulated: &str) -> bool;

    /// Text handed back for a finished response. Unchanged by default.
    fn finalize(&self, response: &str) -> String {
        response.to_string()
    }

    /// A completed response that carries no answer, only the end-of-turn
    /// output of a turn that was already returned
    fn is_leftover(&self, _accumulated: &str) -> bool {
        false
    }
}

/// Complete as soon as a chunk carries the marker character
#[derive(Debug, Clone, Copy)]
pub struct MarkerDetector {
    pub marker: char,
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self { marker: DEFAULT_MARKER }
    }
}

impl ResponseDetector for MarkerDetector {
    fn is_complete(&self, chunk: &str, _accumulated: &str) -> bool {
        chunk.contains(self.marker)
    }

    fn finalize(&self, response: &str) -> String {
        finalize_response(response, Some(self.marker))
    }

    fn is_leftover(&self, accumulated: &str) -> bool {
        accumulated
            .trim()
            .strip_prefix(self.marker)
            .is_some_and(|rest| rest.trim().is_empty())
    }
}

/// Never complete by content; only the idle timeout ends a response
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleOnlyDetector;

impl ResponseDetector for IdleOnlyDetector {
    fn is_complete(&self, _chunk: &str, _accumulated: &str) -> bool {
        false
    }
}

/// Framing knobs, serialized with millisecond durations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// End-of-turn marker; `None` disables marker matching
    pub marker: Option<char>,
    /// Quiet period after which a response is considered complete
    pub idle_timeout_ms: u64,
    /// Upper bound on waiting for the first prompt marker after spawn
    pub ready_timeout_ms: Option<u64>,
    /// Upper bound on waiting for the first chunk of a response
    pub first_output_timeout_ms: Option<u64>,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            marker: Some(DEFAULT_MARKER),
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            ready_timeout_ms: None,
            first_output_timeout_ms: None,
        }
    }
}

impl FramingConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_ms.map(Duration::from_millis)
    }

    pub fn first_output_timeout(&self) -> Option<Duration> {
        self.first_output_timeout_ms.map(Duration::from_millis)
    }

    /// Detector matching `marker`
    pub fn detector(&self) -> Box<dyn ResponseDetector> {
        match self.marker {
            Some(marker) => Box::new(MarkerDetector { marker }),
            None => Box::new(IdleOnlyDetector),
        }
    }
}

/// Strip the redrawn prompt from a finished response.
///
/// Removes one trailing marker (and the whitespace around it) and one stray
/// leading marker left over from the previous turn.
pub fn finalize_response(text: &str, marker: Option<char>) -> String {
    let Some(marker) = marker else {
        return text.to_string();
    };

    let mut out = text;

    let trimmed = out.trim_end();
    if let Some(stripped) = trimmed.strip_suffix(marker) {
        out = stripped.trim_end();
    }

    let trimmed = out.trim_start();
    if let Some(stripped) = trimmed.strip_prefix(marker) {
        out = stripped.trim_start();
    }

    out.to_string()
}

/// Incremental UTF-8 decoding across chunk boundaries
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + bytes` as forms complete characters.
    /// An incomplete sequence at the end is held for the next call; invalid
    /// bytes become U+FFFD.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Flush whatever is left when the stream ends
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detector() {
        let detector = MarkerDetector::default();
        assert!(detector.is_complete("done\n> ", "hello done\n> "));
        assert!(!detector.is_complete("still going", "still going"));
    }

    #[test]
    fn test_marker_detector_finalize_and_leftover() {
        let detector = MarkerDetector::default();
        assert_eq!(detector.finalize("answer\n> "), "answer");
        assert!(detector.is_leftover("\n> "));
        assert!(detector.is_leftover(">"));
        assert!(!detector.is_leftover("answer\n> "));
        assert!(!detector.is_leftover("> >"));
        assert!(!detector.is_leftover(""));
    }

    #[test]
    fn test_idle_only_detector_never_completes() {
        assert_eq!(IdleOnlyDetector.finalize(" a> "), " a> ");
        assert!(!IdleOnlyDetector.is_leftover(">"));
        assert!(!IdleOnlyDetector.is_complete(">", ">"));
    }

    #[test]
    fn test_config_detector_follows_marker() {
        let mut config = FramingConfig::default();
        assert!(config.detector().is_complete("x>", "x>"));
        config.marker = None;
        assert!(!config.detector().is_complete("x>", "x>"));
        config.marker = Some('$');
        assert!(config.detector().is_complete("$", "$"));
    }

    #[test]
    fn test_finalize_strips_trailing_marker() {
        assert_eq!(finalize_response("Hello there.>", Some('>')), "Hello there.");
        assert_eq!(finalize_response("Hello there.\n> ", Some('>')), "Hello there.");
    }

    #[test]
    fn test_finalize_strips_one_marker_only() {
        assert_eq!(finalize_response("a >>", Some('>')), "a >");
    }

    #[test]
    fn test_finalize_strips_leading_marker() {
        assert_eq!(finalize_response("> Hi!\n>", Some('>')), "Hi!");
    }

    #[test]
    fn test_finalize_keeps_inner_marker() {
        assert_eq!(finalize_response("1 > 0 is true", Some('>')), "1 > 0 is true");
    }

    #[test]
    fn test_finalize_without_marker_is_identity() {
        assert_eq!(finalize_response(" text> ", None), " text> ");
    }

    #[test]
    fn test_utf8_decoder_joins_split_sequence() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8Decoder::new();
        // 'é' is two bytes starting at index 1
        let first = decoder.decode(&bytes[..2]);
        let second = decoder.decode(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(second, "éllo");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_utf8_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn test_utf8_decoder_finish_flushes_partial() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xe2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }
}
