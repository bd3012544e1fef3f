//! AI backend settings loaded from environment variables.
//!
//! Reads `AI_API_URL`, `AI_API_KEY` and `AI_MODEL` (normally from `.env`). The
//! itinerary features are disabled when no API key is configured.

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettings {
    /// Full URL of the chat-completions endpoint
    pub api_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model identifier sent with each request
    pub model: String,
}

/// Gets the AI settings from the environment.
///
/// # Returns
///
/// `None` when `AI_API_KEY` is unset or empty; URL and model fall back to defaults.
#[must_use]
pub fn get_ai_settings() -> Option<AiSettings> {
    let api_key = std::env::var("AI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    Some(AiSettings {
        api_url: std::env::var("AI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        api_key,
        model: std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
    })
}
