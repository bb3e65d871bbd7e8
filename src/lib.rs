//! Drives the pre-built GPT4All chat executable as a subprocess.
//!
//! ```no_run
//! # async fn demo() -> gpt4all_bridge::BridgeResult<()> {
//! use gpt4all_bridge::{Gpt4All, Gpt4AllConfig};
//!
//! let mut gpt4all = Gpt4All::new(Gpt4AllConfig::default())?;
//! gpt4all.init(false).await?;
//! gpt4all.open().await?;
//! let response = gpt4all.prompt("Tell me about open access to AI.").await?;
//! println!("{}", response);
//! gpt4all.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod hardware;
pub mod models;
pub mod session;
pub mod setup;

pub use client::Gpt4All;
pub use config::{DecoderConfig, Gpt4AllConfig};
pub use error::{BridgeError, BridgeResult};
pub use models::SupportedModel;
pub use session::{ChatSession, FramingConfig};
