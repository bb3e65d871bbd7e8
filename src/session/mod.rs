//! Session Module
//!
//! Drives the chat executable over its stdin/stdout: spawning, readiness,
//! prompt/response framing and shutdown.

pub mod framing;
pub mod process;
pub mod reader;


pub use framing::{
    finalize_response, FramingConfig, IdleOnlyDetector, MarkerDetector, ResponseDetector,
};
pub use process::ChatSession;
pub use reader::ResponseReader;
