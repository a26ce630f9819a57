//! Incident classification via the Anthropic Messages API.
//!
//! One request per incident: a fixed instruction prompt embedding the report
//! text and the closed category list, answered by the model's top text
//! block. Failures propagate to the pipeline; there is no retry here.

use anyhow::{bail, Result};

/// Category list embedded in the prompt. The model's answer is carried as
/// free text; an unexpected label passes through rather than failing the
/// job.
const CATEGORIES: &str = "[Network Issue, Application Bug, Security Alert, Other]";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 512;
const TEMPERATURE: f32 = 0.3;

/// Result of one classification call: the category label plus whatever
/// rationale text the model appended, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub label: String,
}

/// Client for the inference endpoint. The base URL is injected so tests can
/// point it at a local mock server.
pub struct Classifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Classifier {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    fn prompt(text: &str) -> String {
        format!(
            "Please classify the following incident message into one of these categories:\n\
             {CATEGORIES}\n\
             Incident: \"{text}\""
        )
    }

    /// Classify one incident report.
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": Self::prompt(text) }]
            }]
        });

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

        if !status.is_success() {
            bail!("inference endpoint returned {status}: {body_text}");
        }

        let data: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| anyhow::anyhow!("inference response is not valid JSON: {e}"))?;

        let label = data
            .pointer("/content/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("inference response missing content[0].text"))?
            .trim()
            .to_string();

        if label.is_empty() {
            bail!("inference response text is empty");
        }

        Ok(ClassificationResult { label })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
