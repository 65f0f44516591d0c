//! The boundary to the automation client that talks to the image bot.
//!
//! The chat protocol itself (gateway handshake, message polling, rate
//! limiting) lives behind [`ImagineBot`]. The crate ships [`crate::RelayBot`],
//! which delegates to an out-of-process relay; tests substitute their own
//! implementation.

use crate::error::Result;
use crate::types::{BotCredentials, JobHandle, JobProgress, UpscaleTarget};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receives progress notifications while a job is running.
pub type ProgressSender = mpsc::UnboundedSender<JobProgress>;

/// An open connection to the automation client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSession {
    pub id: String,
    pub server_id: String,
    pub channel_id: String,
}

#[async_trait]
pub trait ImagineBot: Send + Sync {
    /// Opens a session for the given server and channel.
    async fn connect(&self, credentials: &BotCredentials) -> Result<BotSession>;

    /// Submits a generation and waits until the bot reports it finished.
    ///
    /// `Ok(None)` means the call completed without producing a job.
    async fn submit_generate(
        &self,
        session: &BotSession,
        prompt: &str,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>>;

    /// Submits an upscale of one quadrant and waits for it to finish.
    async fn submit_upscale(
        &self,
        session: &BotSession,
        target: &UpscaleTarget,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>>;

    async fn close(&self, session: BotSession) -> Result<()>;
}

/// Creates a progress channel whose messages are written to the log.
///
/// The draining task ends once every sender has been dropped.
pub fn logging_progress_channel(label: &'static str) -> ProgressSender {
    let (tx, mut rx) = mpsc::unbounded_channel::<JobProgress>();
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            tracing::debug!(
                job = %update.job_id,
                progress = %update.progress,
                preview = update.uri.as_deref().unwrap_or(""),
                "{} progress",
                label
            );
        }
    });
    tx
}
