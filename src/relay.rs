use crate::bot::{BotSession, ImagineBot, ProgressSender};
use crate::error::{Result, StudioError};
use crate::types::{
    ApiResponse, BotCredentials, ImagineBody, JobHandle, JobProgress, JobState, JobStatus,
    SessionData, SubmittedJob, UpscaleTarget,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_POLLS: u32 = 200;

/// An [`ImagineBot`] backed by an automation relay reachable over HTTP.
///
/// The relay owns the chat protocol. This client opens a session, submits
/// jobs and polls them until the relay reports a terminal state.
///
/// It holds a shared `reqwest::Client` and is cheap to clone.
#[derive(Clone, Debug)]
pub struct RelayBot {
    client: reqwest::Client,
    base_url: Url,
    poll_interval: Duration,
    max_polls: u32,
}

impl RelayBot {
    /// Creates a relay client for the given base URL.
    ///
    /// # Errors
    ///
    /// - `StudioError::RequestFailed` if the internal HTTP client fails to build.
    /// - `StudioError::UrlParseFailed` if `base_url` is invalid.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        // `Url::join` replaces the last path segment unless the base ends in '/'.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            base_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on status polls before a job is considered timed out.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Waits for a job to finish by polling its status.
    ///
    /// Every poll that carries progress is forwarded to `progress`; a closed
    /// receiver is ignored.
    ///
    /// # Returns
    ///
    /// The finished job, or `None` when the relay reports success without a result.
    pub async fn wait_for_job(
        &self,
        session: &BotSession,
        job_id: &str,
        progress: &ProgressSender,
    ) -> Result<Option<JobHandle>> {
        let url = self
            .base_url
            .join(&format!("sessions/{}/jobs/{}", session.id, job_id))?;

        for _ in 0..self.max_polls {
            let response = self.client.get(url.clone()).send().await?;
            let status: JobStatus = read_data(response).await?;

            if let Some(text) = status.progress.clone() {
                let _ = progress.send(JobProgress {
                    job_id: status.job_id.clone(),
                    progress: text,
                    uri: status.preview_uri.clone(),
                });
            }

            match status.status {
                JobState::Success => return Ok(status.result),
                JobState::Failure => {
                    return Err(StudioError::Job(
                        status
                            .error
                            .unwrap_or_else(|| format!("job {} failed", status.job_id)),
                    ))
                }
                JobState::Pending | JobState::Running => {
                    sleep(self.poll_interval).await;
                }
            }
        }

        Err(StudioError::Job(format!(
            "job {} did not finish after {} polls",
            job_id, self.max_polls
        )))
    }

    async fn submit(&self, path: String, body: &impl serde::Serialize) -> Result<String> {
        let url = self.base_url.join(&path)?;
        let response = self.client.post(url).json(body).send().await?;
        let job: SubmittedJob = read_data(response).await?;
        tracing::debug!(job = %job.job_id, "submitted job to relay");
        Ok(job.job_id)
    }
}

#[async_trait]
impl ImagineBot for RelayBot {
    async fn connect(&self, credentials: &BotCredentials) -> Result<BotSession> {
        let url = self.base_url.join("sessions")?;
        let opened = async {
            let response = self.client.post(url).json(credentials).send().await?;
            read_data::<SessionData>(response).await
        };
        let data = opened
            .await
            .map_err(|e| StudioError::Job(format!("failed to connect: {}", e)))?;

        Ok(BotSession {
            id: data.session_id,
            server_id: credentials.server_id.clone(),
            channel_id: credentials.channel_id.clone(),
        })
    }

    async fn submit_generate(
        &self,
        session: &BotSession,
        prompt: &str,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>> {
        let job_id = self
            .submit(format!("sessions/{}/imagine", session.id), &ImagineBody { prompt })
            .await?;
        self.wait_for_job(session, &job_id, &progress).await
    }

    async fn submit_upscale(
        &self,
        session: &BotSession,
        target: &UpscaleTarget,
        progress: ProgressSender,
    ) -> Result<Option<JobHandle>> {
        let job_id = self
            .submit(format!("sessions/{}/upscale", session.id), target)
            .await?;
        self.wait_for_job(session, &job_id, &progress).await
    }

    async fn close(&self, session: BotSession) -> Result<()> {
        let url = self.base_url.join(&format!("sessions/{}", session.id))?;
        let response = self.client.delete(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(StudioError::ApiError {
                message: format!("relay returned {}: {}", status, error_body(response).await),
            })
        }
    }
}

async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if response.status().is_success() {
        let api_response: ApiResponse<T> = response.json().await?;
        Ok(api_response.data)
    } else {
        let status = response.status();
        Err(StudioError::ApiError {
            message: format!("relay returned {}: {}", status, error_body(response).await),
        })
    }
}

/// The raw body of a failed response, whatever its content type.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
        Ok(_) => "<empty body>".to_string(),
        Err(err) => format!("<unreadable body: {}>", err),
    }
}
