//! Process configuration.
//!
//! Secrets and endpoints are read from the environment exactly once at
//! startup and passed into constructors explicitly, so nothing consults the
//! environment after boot, so tests can point every component at a local
//! mock server.

use anyhow::{Context, Result};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token for outbound `chat.postMessage` calls.
    pub bot_token: String,
    /// Signing secret verifying inbound request signatures.
    pub signing_secret: String,
    /// API key for the inference endpoint.
    pub anthropic_api_key: String,
    /// Model id sent with each classification request.
    pub model: String,
    pub slack_api_base: String,
    pub anthropic_api_base: String,
}

impl Config {
    /// Load from the environment. A missing or empty secret is a fatal
    /// startup error.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bot_token: required("SLACK_BOT_TOKEN")?,
            signing_secret: required("SLACK_SIGNING_SECRET")?,
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            model: optional("TRIAGE_MODEL", DEFAULT_MODEL),
            slack_api_base: trim_base(&optional("SLACK_API_BASE", DEFAULT_SLACK_API_BASE)),
            anthropic_api_base: trim_base(&optional(
                "ANTHROPIC_API_BASE",
                DEFAULT_ANTHROPIC_API_BASE,
            )),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} must be set"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Drop a trailing slash so call sites can join with `{base}/path`.
fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
