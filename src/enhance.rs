use crate::config::DEFAULT_OPENAI_BASE_URL;
use crate::error::{Result, StudioError};
use crate::prompt::clean_enhanced_prompt;
use crate::relay::error_body;
use serde::{Deserialize, Serialize};
use url::Url;

const MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 500;

const SYSTEM_INSTRUCTION: &str = "You write prompts for an image bot that produces commercial stock photography. \
Rewrite the user's idea as one photorealistic, marketable prompt:
- describe lighting, composition, color palette, camera angle and setting
- prefer clean backgrounds, copy space and a modern, professional look
- keep the subject centered and fully in frame
- you may add an aspect ratio with --ar
Never add version parameters (--v), quality parameters (--q) or HD flags.
Never ask for close-ups, intricate fine detail such as individual leaves, or anything profane or suggestive.
Keep it under 200 characters and keep the original intent.
Reply with the prompt only, no explanation.";

/// Rewrites prompts with a chat-completion model.
#[derive(Clone, Debug)]
pub struct PromptEnhancer {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl PromptEnhancer {
    /// Creates an enhancer talking to the public OpenAI API.
    pub fn new() -> Result<Self> {
        Self::new_with_url(DEFAULT_OPENAI_BASE_URL)
    }

    /// Creates an enhancer for any OpenAI-compatible endpoint.
    ///
    /// # Errors
    ///
    /// - `StudioError::RequestFailed` if the internal HTTP client fails to build.
    /// - `StudioError::UrlParseFailed` if `base_url` is invalid.
    pub fn new_with_url(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        Ok(Self { client, base_url })
    }

    /// Returns a cleaned, model-written version of `prompt`.
    ///
    /// An empty reply falls back to `prompt` itself. Transport and API
    /// failures are reported as `StudioError::Enhancement`.
    pub async fn enhance(&self, prompt: &str, api_key: &str) -> Result<String> {
        let url = self.base_url.join("v1/chat/completions")?;
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Enhance this image prompt for a professional stock photo: \"{}\"",
                        prompt
                    ),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| StudioError::Enhancement(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(StudioError::Enhancement(format!(
                "model returned {}: {}",
                status,
                error_body(response).await
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| StudioError::Enhancement(e.to_string()))?;

        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .unwrap_or_else(|| prompt.to_string());

        Ok(clean_enhanced_prompt(&reply))
    }
}
