//! An HTTP service that turns prompts into stored stock images via an image bot.
//!
//! A generation request is turned into a prompt (built from parameters or
//! rewritten by a language model), submitted to the bot through an
//! automation client, and the finished 2x2 contact sheet is downloaded, cut
//! into four images and uploaded to S3. Upscale requests follow the same path
//! for a single image.
//!
//! ## Features
//! - Deterministic prompt building and optional AI enhancement with fallback.
//! - A pluggable [`ImagineBot`] boundary with an HTTP relay implementation.
//! - Bounded, fixed-delay retries around job submission.
//! - Quadrant splitting and concurrent uploads to an [`ArtifactStore`].
//! - An axum router exposing `/api/generate` and `/api/upscale`.

pub mod bot;
pub mod config;
pub mod enhance;
pub mod error;
pub mod imaging;
pub mod naming;
pub mod prompt;
pub mod relay;
pub mod retry;
pub mod server;
pub mod storage;
pub mod studio;
pub mod types;

pub use bot::{BotSession, ImagineBot, ProgressSender};
pub use config::{ServerConfig, StorageConfig};
pub use enhance::PromptEnhancer;
pub use error::{Result, StudioError};
pub use relay::RelayBot;
pub use retry::{retry_operation, RetryPolicy};
pub use storage::{ArtifactStore, S3Storage};
pub use studio::Studio;
pub use types::*;
