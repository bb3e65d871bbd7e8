//! Hardware Detection Module
//!
//! Host OS/architecture detection for executable selection.

pub mod platform;

pub use platform::{detect_platform, Platform};
