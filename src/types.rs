use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional directives appended to a prompt in deterministic mode.
///
/// Every field is optional. `sref` and `no` are accepted from callers but are
/// not emitted by [`crate::prompt::build_prompt`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    /// Aspect ratio, e.g. `16:9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ar: Option<String>,
    /// Quality, e.g. `0.25`, `1`, `2`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// Model version, e.g. `6.1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// 0 to 100. Not range-checked here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uplight: Option<bool>,
    /// Style reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sref: Option<String>,
    /// Elements to exclude.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub no: Vec<String>,
}

/// Identifiers the automation relay needs to act on behalf of a user.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotCredentials {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub token: String,
}

impl BotCredentials {
    pub fn new(
        server_id: impl Into<String>,
        channel_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            channel_id: channel_id.into(),
            token: token.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.server_id) || is_blank(&self.channel_id) || is_blank(&self.token) {
            return Err(StudioError::Validation(
                "Server ID, Channel ID and Token are required".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for BotCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotCredentials")
            .field("server_id", &self.server_id)
            .field("channel_id", &self.channel_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A request to generate a 2x2 contact sheet and split it into four images.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "enhanceWithAI")]
    pub enhance_with_ai: bool,
    #[serde(default)]
    pub parameters: Option<GenerationParameters>,
    /// Accepted for compatibility with existing callers. Not forwarded to the bot.
    #[serde(default)]
    pub multiplier: Option<f64>,
    #[serde(flatten)]
    pub credentials: BotCredentials,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, credentials: BotCredentials) -> Self {
        Self {
            prompt: prompt.into(),
            credentials,
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_enhancement(mut self, openai_api_key: impl Into<String>) -> Self {
        self.enhance_with_ai = true;
        self.openai_api_key = Some(openai_api_key.into());
        self
    }

    /// Rejects the request before any external call is made.
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.prompt) {
            return Err(StudioError::Validation("Prompt is required".to_string()));
        }
        self.credentials.validate()?;
        if self.enhance_with_ai && self.openai_api_key.as_deref().map_or(true, is_blank) {
            return Err(StudioError::Validation(
                "OpenAI API key is required for enhancement".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt", &self.prompt)
            .field("enhance_with_ai", &self.enhance_with_ai)
            .field("parameters", &self.parameters)
            .field("multiplier", &self.multiplier)
            .field("credentials", &self.credentials)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// A request to upscale one quadrant of a finished generation job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleRequest {
    #[serde(default)]
    pub msg_id: String,
    #[serde(default)]
    pub hash: String,
    /// May legitimately be 0, so absence is tracked separately.
    #[serde(default)]
    pub flags: Option<u64>,
    /// 1-based quadrant index. Trusted input, not range-checked.
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(flatten)]
    pub credentials: BotCredentials,
}

impl UpscaleRequest {
    pub fn new(job: &JobHandle, index: u32, credentials: BotCredentials) -> Self {
        Self {
            msg_id: job.id.clone(),
            hash: job.hash.clone(),
            flags: Some(job.flags),
            index: Some(index),
            credentials,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.target()?;
        self.credentials.validate()
    }

    /// The job coordinates forwarded to the bot.
    pub fn target(&self) -> Result<UpscaleTarget> {
        match (self.flags, self.index) {
            (Some(flags), Some(index))
                if !is_blank(&self.msg_id) && !is_blank(&self.hash) && index != 0 =>
            {
                Ok(UpscaleTarget {
                    msg_id: self.msg_id.clone(),
                    hash: self.hash.clone(),
                    flags,
                    index,
                })
            }
            _ => Err(StudioError::Validation(
                "Missing required parameters".to_string(),
            )),
        }
    }
}

/// Which quadrant of which job to upscale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpscaleTarget {
    pub msg_id: String,
    pub hash: String,
    pub flags: u64,
    pub index: u32,
}

/// The completed job as reported by the bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Message id of the bot's reply.
    pub id: String,
    pub hash: String,
    #[serde(default)]
    pub flags: u64,
    /// Raw message text, usually containing the prompt between `**` markers.
    #[serde(default)]
    pub content: String,
    /// Where the finished image can be downloaded.
    pub uri: String,
}

/// An intermediate progress notification for a running job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub job_id: String,
    /// Free-form progress text such as `45%`.
    pub progress: String,
    /// Preview image, when the bot publishes one.
    pub uri: Option<String>,
}

/// One stored quadrant of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub url: String,
    pub msg_id: String,
    pub hash: String,
    pub flags: u64,
    /// 1-based, row-major quadrant position.
    pub index: u32,
    pub content: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaledImage {
    pub url: String,
    pub content: String,
}

/// Result of the generation pipeline.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub images: Vec<GeneratedImage>,
    /// Set only when enhancement was requested and succeeded.
    pub enhanced_prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub images: Vec<GeneratedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpscaleResponse {
    pub success: bool,
    pub image: UpscaledImage,
}

/// (Internal) A wrapper for relay responses whose content is nested under "data".
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionData {
    pub(crate) session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmittedJob {
    pub(crate) job_id: String,
}

#[derive(Serialize)]
pub(crate) struct ImagineBody<'a> {
    pub(crate) prompt: &'a str,
}

/// Represents the lifecycle state of a relay job.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Submitted, the bot has not picked it up yet.
    Pending,
    /// The bot is rendering.
    Running,
    Success,
    Failure,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatus {
    pub(crate) job_id: String,
    pub(crate) status: JobState,
    #[serde(default)]
    pub(crate) progress: Option<String>,
    #[serde(default)]
    pub(crate) preview_uri: Option<String>,
    #[serde(default)]
    pub(crate) result: Option<JobHandle>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credentials() -> BotCredentials {
        BotCredentials::new("server", "channel", "token")
    }

    #[test]
    fn generation_request_reads_camel_case_body() {
        let request: GenerationRequest = serde_json::from_value(json!({
            "prompt": "a red fox",
            "enhanceWithAI": true,
            "parameters": { "ar": "16:9", "tile": true },
            "serverId": "s",
            "channelId": "c",
            "token": "t",
            "openaiApiKey": "sk-test"
        }))
        .unwrap();

        assert_eq!(request.prompt, "a red fox");
        assert!(request.enhance_with_ai);
        assert_eq!(request.credentials, BotCredentials::new("s", "c", "t"));
        assert_eq!(request.openai_api_key.as_deref(), Some("sk-test"));
        let parameters = request.parameters.unwrap();
        assert_eq!(parameters.ar.as_deref(), Some("16:9"));
        assert_eq!(parameters.tile, Some(true));
        assert!(parameters.no.is_empty());
    }

    #[test]
    fn missing_server_id_is_rejected() {
        let request: GenerationRequest = serde_json::from_value(json!({
            "prompt": "a red fox",
            "channelId": "c",
            "token": "t"
        }))
        .unwrap();

        let err = request.validate().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn enhancement_requires_api_key() {
        let mut request = GenerationRequest::new("a red fox", credentials());
        request.enhance_with_ai = true;
        assert!(request.validate().unwrap_err().is_validation());

        let request = GenerationRequest::new("a red fox", credentials()).with_enhancement("sk");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn upscale_accepts_zero_flags_but_not_missing_flags() {
        let mut request = UpscaleRequest {
            msg_id: "m".into(),
            hash: "h".into(),
            flags: Some(0),
            index: Some(2),
            credentials: credentials(),
        };
        assert!(request.validate().is_ok());

        request.flags = None;
        assert!(request.validate().unwrap_err().is_validation());
    }

    #[test]
    fn credentials_debug_hides_token() {
        let rendered = format!("{:?}", BotCredentials::new("s", "c", "secret-token"));
        assert!(!rendered.contains("secret-token"));
    }
}
