//! Storage-safe file names for generated and upscaled images.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

const MAX_BASE_LEN: usize = 100;
const FALLBACK_BASE: &str = "generated-image";

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

/// Lowercases `text` and reduces it to `[a-z0-9-]`, at most 100 characters.
///
/// Applying it twice gives the same result as applying it once.
pub fn sanitize(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lower, "");
    let hyphenated = WHITESPACE.replace_all(&stripped, "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    let truncated: String = collapsed.chars().take(MAX_BASE_LEN).collect();
    match truncated.strip_suffix('-') {
        Some(trimmed) => trimmed.to_string(),
        None => truncated,
    }
}

/// `{prompt}-{index}{4 hex}.png`
pub fn quadrant_filename(prompt: &str, index: u32) -> String {
    format!("{}-{}{}.png", base_or_fallback(sanitize(prompt)), index, short_id(4))
}

/// `{prompt from content}-upscaled-{8 hex}.png`
///
/// The prompt is taken from the first `**...**` span of the bot's message.
pub fn upscale_filename(content: &str) -> String {
    let base = match EMPHASIS.captures(content).and_then(|c| c.get(1)) {
        Some(prompt) => sanitize(prompt.as_str()),
        None => sanitize(&format!("upscaled-image-{}", Uuid::new_v4())),
    };
    format!("{}-upscaled-{}.png", base_or_fallback(base), short_id(8))
}

fn base_or_fallback(base: String) -> String {
    if base.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        base
    }
}

fn short_id(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_string()
}
