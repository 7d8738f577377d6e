use crate::error::GenerationError;
use crate::theme::Theme;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub const EXCERPT_MAX_CHARS: usize = 160;

static BRACED_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex"));

/// A post as returned by the model, validated and tagged with its theme's taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPost {
    pub title: String,
    pub excerpt: String,
    pub html: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// Source of raw completion text.
pub trait TextGenerator {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// No waiting between attempts.
    pub const fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1_500))
    }
}

/// First stage: the whole (trimmed) text is a JSON object.
pub fn parse_whole_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Second stage: the span from the first `{` to the last `}`.
pub fn extract_braced_object(text: &str) -> Option<&str> {
    BRACED_OBJECT.find(text).map(|m| m.as_str())
}

/// Recover a JSON object from free-form model text using both stages in order.
pub fn recover_json_object(text: &str) -> Result<Map<String, Value>, GenerationError> {
    if let Some(map) = parse_whole_object(text) {
        return Ok(map);
    }

    let candidate = extract_braced_object(text)
        .ok_or_else(|| GenerationError::Malformed("no JSON object found".to_string()))?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GenerationError::Malformed(
            "embedded JSON is not an object".to_string(),
        )),
        Err(err) => Err(GenerationError::Malformed(format!(
            "embedded JSON does not parse: {err}"
        ))),
    }
}

fn required_text(map: &Map<String, Value>, key: &str) -> Result<String, GenerationError> {
    match map.get(key) {
        Some(Value::String(value)) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(GenerationError::Malformed(format!("`{key}` is blank")))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(_) => Err(GenerationError::Malformed(format!("`{key}` is not a string"))),
        None => Err(GenerationError::Malformed(format!("`{key}` is missing"))),
    }
}

fn optional_text(map: &Map<String, Value>, key: &str) -> Result<String, GenerationError> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(value.trim().to_string()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(_) => Err(GenerationError::Malformed(format!("`{key}` is not a string"))),
    }
}

/// Cut `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

/// Turn raw model output into a [`GeneratedPost`] for `theme`.
pub fn post_from_model_output(
    raw: &str,
    theme: &Theme,
    storefront_url: Option<&str>,
) -> Result<GeneratedPost, GenerationError> {
    let map = recover_json_object(raw)?;
    let title = required_text(&map, "title")?;
    let mut html = required_text(&map, "html")?;
    let excerpt = optional_text(&map, "excerpt")?;

    if theme.is_weekly_plan() {
        if let Some(url) = storefront_url.map(str::trim).filter(|url| !url.is_empty()) {
            if !html.contains(url) {
                html.push_str(&format!(
                    "<p><a href=\"{url}\">Grab this week’s full Feed the Chaos plan here.</a></p>"
                ));
            }
        }
    }

    Ok(GeneratedPost {
        title,
        excerpt: truncate_chars(&excerpt, EXCERPT_MAX_CHARS),
        html,
        category: theme.category.clone(),
        tags: theme.tags.clone(),
    })
}

/// Ask `generator` for a post, retrying any failure according to `policy`.
pub async fn request_generation<G>(
    generator: &G,
    prompt: &str,
    theme: &Theme,
    storefront_url: Option<&str>,
    policy: &RetryPolicy,
) -> Result<GeneratedPost, GenerationError>
where
    G: TextGenerator + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let outcome = match generator.complete(prompt).await {
            Ok(raw) => post_from_model_output(&raw, theme, storefront_url),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(post) => {
                info!(attempt, title = %post.title, "Generated post");
                return Ok(post);
            }
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "Generation attempt failed");
                last_error = Some(err);
                if attempt < max_attempts && !policy.delay.is_zero() {
                    sleep(policy.delay).await;
                }
            }
        }
    }

    Err(GenerationError::Exhausted {
        attempts: max_attempts,
        last: Box::new(last_error.unwrap_or(GenerationError::EmptyResponse)),
    })
}
