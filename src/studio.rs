use crate::bot::{logging_progress_channel, BotSession, ImagineBot};
use crate::config::ServerConfig;
use crate::enhance::PromptEnhancer;
use crate::error::{Result, StudioError};
use crate::imaging::{split_into_quadrants, Quadrant};
use crate::naming::{quadrant_filename, upscale_filename};
use crate::prompt::build_prompt;
use crate::relay::RelayBot;
use crate::retry::{retry_operation, RetryPolicy};
use crate::storage::{ArtifactStore, S3Storage, GENERATED_FOLDER, UPSCALED_FOLDER};
use crate::types::{
    GeneratedImage, GenerationOutcome, GenerationRequest, JobHandle, UpscaleRequest, UpscaleTarget,
    UpscaledImage,
};
use futures_util::future::join_all;
use std::sync::Arc;

/// Runs generation and upscale requests end to end.
///
/// Each call opens its own bot session and keeps no state afterwards, so a
/// single `Studio` can serve concurrent requests.
#[derive(Clone)]
pub struct Studio {
    bot: Arc<dyn ImagineBot>,
    store: Arc<dyn ArtifactStore>,
    enhancer: PromptEnhancer,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl Studio {
    /// Creates a studio with the default enhancer endpoint and retry policy.
    pub fn new(bot: Arc<dyn ImagineBot>, store: Arc<dyn ArtifactStore>) -> Result<Self> {
        Ok(Self {
            bot,
            store,
            enhancer: PromptEnhancer::new()?,
            http: reqwest::Client::builder().build()?,
            retry: RetryPolicy::default(),
        })
    }

    /// Wires a [`RelayBot`] and [`S3Storage`] from server configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let bot = RelayBot::new(config.relay_url()?)?
            .with_poll_interval(config.relay_poll_interval)
            .with_max_polls(config.relay_max_polls);
        let store = S3Storage::new(config.storage.clone());

        Ok(Self::new(Arc::new(bot), Arc::new(store))?
            .with_enhancer(PromptEnhancer::new_with_url(&config.openai_base_url)?)
            .with_retry_policy(config.retry))
    }

    pub fn with_enhancer(mut self, enhancer: PromptEnhancer) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// Policy for job submission. Fetches and uploads are never retried.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generates a contact sheet, splits it and stores the four images.
    ///
    /// # Errors
    ///
    /// - `StudioError::Validation` before any external call if the request is incomplete.
    /// - `StudioError::Job`, `Fetch`, `Partition` or `Storage` when a stage fails.
    ///   If one upload fails the whole call fails, even though sibling uploads
    ///   may already be stored.
    ///
    /// A failed prompt enhancement is not an error: the caller's prompt is
    /// submitted as given, without parameter directives, and
    /// `enhanced_prompt` is left empty.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        request.validate()?;

        let (prompt, enhanced_prompt) = self.compose_prompt(request).await;
        tracing::info!(
            prompt = %prompt,
            enhanced = enhanced_prompt.is_some(),
            "starting generation"
        );

        // File names follow the prompt without parameter directives.
        let naming = enhanced_prompt.as_deref().unwrap_or(request.prompt.as_str());

        let session = self.bot.connect(&request.credentials).await?;
        let outcome = self.generate_in_session(&session, &prompt, naming).await;
        self.release(session).await;

        Ok(GenerationOutcome {
            images: outcome?,
            enhanced_prompt,
        })
    }

    /// Upscales one quadrant of an earlier job and stores the result.
    pub async fn upscale(&self, request: &UpscaleRequest) -> Result<UpscaledImage> {
        request.validate()?;
        let target = request.target()?;
        tracing::info!(msg_id = %target.msg_id, index = target.index, "starting upscale");

        let session = self.bot.connect(&request.credentials).await?;
        let outcome = self.upscale_in_session(&session, &target).await;
        self.release(session).await;
        outcome
    }

    async fn compose_prompt(&self, request: &GenerationRequest) -> (String, Option<String>) {
        if !request.enhance_with_ai {
            let prompt = build_prompt(&request.prompt, request.parameters.as_ref());
            return (prompt, None);
        }

        let api_key = request.openai_api_key.as_deref().unwrap_or_default();
        match self.enhancer.enhance(&request.prompt, api_key).await {
            Ok(enhanced) => {
                tracing::info!(enhanced = %enhanced, "enhanced prompt");
                (enhanced.clone(), Some(enhanced))
            }
            Err(err) => {
                tracing::warn!(error = %err, "prompt enhancement failed, using original prompt");
                (request.prompt.clone(), None)
            }
        }
    }

    async fn generate_in_session(
        &self,
        session: &BotSession,
        prompt: &str,
        naming: &str,
    ) -> Result<Vec<GeneratedImage>> {
        let progress = logging_progress_channel("imagine");
        let bot = self.bot.as_ref();
        let progress_tx = &progress;

        let job = retry_operation(&self.retry, move || {
            bot.submit_generate(session, prompt, progress_tx.clone())
        })
        .await?
        .ok_or_else(|| StudioError::Job("Failed to generate initial image".to_string()))?;
        tracing::info!(msg_id = %job.id, "generation finished");

        let bytes = self.fetch(&job.uri).await?;
        let quadrants = tokio::task::spawn_blocking(move || split_into_quadrants(&bytes))
            .await
            .map_err(|e| StudioError::Partition(e.to_string()))??;

        let results = join_all(
            quadrants
                .into_iter()
                .map(|quadrant| self.store_quadrant(&job, naming, quadrant)),
        )
        .await;

        let mut images = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(image) => images.push(image),
                Err(err) if first_error.is_none() => first_error = Some(err),
                Err(err) => tracing::warn!(error = %err, "additional upload failure"),
            }
        }

        if let Some(err) = first_error {
            if !images.is_empty() {
                let orphaned: Vec<&str> = images.iter().map(|image| image.url.as_str()).collect();
                tracing::warn!(
                    ?orphaned,
                    "upload failed, already stored quadrants are left in place"
                );
            }
            return Err(err);
        }

        Ok(images)
    }

    async fn upscale_in_session(
        &self,
        session: &BotSession,
        target: &UpscaleTarget,
    ) -> Result<UpscaledImage> {
        let progress = logging_progress_channel("upscale");
        let bot = self.bot.as_ref();
        let progress_tx = &progress;

        let job = retry_operation(&self.retry, move || {
            bot.submit_upscale(session, target, progress_tx.clone())
        })
        .await?
        .ok_or_else(|| StudioError::Job("Failed to upscale image".to_string()))?;

        let bytes = self.fetch(&job.uri).await?;
        let filename = upscale_filename(&job.content);
        let url = self.store.upload(bytes, UPSCALED_FOLDER, &filename).await?;

        Ok(UpscaledImage {
            url,
            content: job.content,
        })
    }

    async fn store_quadrant(
        &self,
        job: &JobHandle,
        naming: &str,
        quadrant: Quadrant,
    ) -> Result<GeneratedImage> {
        let filename = quadrant_filename(naming, quadrant.index);
        let url = self
            .store
            .upload(quadrant.png, GENERATED_FOLDER, &filename)
            .await?;

        Ok(GeneratedImage {
            url,
            msg_id: job.id.clone(),
            hash: job.hash.clone(),
            flags: job.flags,
            index: quadrant.index,
            content: job.content.clone(),
            filename,
        })
    }

    /// Downloads the finished image into memory.
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(uri)
            .send()
            .await
            .map_err(|e| StudioError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StudioError::Fetch(format!(
                "{} returned status {}",
                uri,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StudioError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Closes the session; failures are logged, never returned.
    async fn release(&self, session: BotSession) {
        let session_id = session.id.clone();
        if let Err(err) = self.bot.close(session).await {
            tracing::warn!(session = %session_id, error = %err, "failed to close bot session");
        }
    }
}
