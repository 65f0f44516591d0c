//! Prompt assembly for the image bot.

use crate::types::GenerationParameters;
use once_cell::sync::Lazy;
use regex::Regex;

/// Directives a language model tends to add even when told not to.
static BANNED_DIRECTIVES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\s+--v\s*\d+(\.\d+)?",
        r"\s+--version\s*\d+(\.\d+)?",
        r"\s+--hd\b",
        r"\s+--quality\s*\d+",
        r"\s+--q\s*\d+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Appends parameter directives to `base` in a fixed order.
///
/// Order is `--ar`, `--q`, `--v`, `--seed`, `--chaos`, `--tile`, `--uplight`.
/// Empty strings, zero seed or chaos and `false` flags are treated as absent.
/// Values are not range-checked.
pub fn build_prompt(base: &str, parameters: Option<&GenerationParameters>) -> String {
    let Some(p) = parameters else {
        return base.to_string();
    };
    let mut parts = vec![base.to_string()];

    if let Some(ar) = non_empty(&p.ar) {
        parts.push(format!("--ar {}", ar));
    }
    if let Some(q) = non_empty(&p.q) {
        parts.push(format!("--q {}", q));
    }
    if let Some(v) = non_empty(&p.v) {
        parts.push(format!("--v {}", v));
    }
    if let Some(seed) = p.seed.filter(|&seed| seed != 0) {
        parts.push(format!("--seed {}", seed));
    }
    if let Some(chaos) = p.chaos.filter(|&chaos| chaos != 0) {
        parts.push(format!("--chaos {}", chaos));
    }
    if p.tile == Some(true) {
        parts.push("--tile".to_string());
    }
    if p.uplight == Some(true) {
        parts.push("--uplight".to_string());
    }

    parts.join(" ")
}

/// Strips version, quality and HD directives plus quotes, periods and commas
/// from a model-written prompt.
pub fn clean_enhanced_prompt(prompt: &str) -> String {
    let mut cleaned = prompt.to_string();
    for pattern in BANNED_DIRECTIVES.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned.retain(|c| !matches!(c, '"' | '.' | ','));
    cleaned.trim().to_string()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
