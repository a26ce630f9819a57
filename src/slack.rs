//! Outbound Slack messaging.
//!
//! Posts classification replies back to the originating channel via
//! `chat.postMessage`. Slack returns HTTP 200 for most app-level errors, so
//! the in-body `"ok"` field is checked as well as the status.

use anyhow::Result;

/// Maximum model-produced label length embedded into a reply.
const MAX_LABEL_LEN: usize = 256;

/// Client for the Slack Web API. The base URL is injected so tests can point
/// it at a local mock server.
pub struct Notifier {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl Notifier {
    pub fn new(client: reqwest::Client, base_url: String, bot_token: String) -> Self {
        Self {
            client,
            base_url,
            bot_token,
        }
    }

    /// Post a classification reply to the originating channel.
    pub async fn notify(&self, channel: &str, label: &str) -> Result<()> {
        let label = sanitize_label(label);
        let text = format!("Incident classified as: *{label}*");
        self.post_message(channel, &text).await
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({ "channel": channel, "text": text });

        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

        if !status.is_success() {
            anyhow::bail!("Slack chat.postMessage failed ({status}): {body}");
        }

        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
        if parsed.get("ok") == Some(&serde_json::Value::Bool(false)) {
            let err = parsed
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown");
            anyhow::bail!("Slack chat.postMessage failed: {err}");
        }

        Ok(())
    }
}

/// Strip mrkdwn-sensitive characters from model-produced text before
/// embedding it in a reply.
///
/// Removes `@` (mention injection), `<`, `>`, `&` (mrkdwn entities and
/// `<url|text>` links), `` ` ``, `*`, `~` (formatting breakout), and control
/// characters. Truncates to [`MAX_LABEL_LEN`] Unicode scalar values.
fn sanitize_label(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '@' | '<' | '>' | '&' | '`' | '*' | '~') && !c.is_control())
        .take(MAX_LABEL_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
