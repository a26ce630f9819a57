//! Slack Events API envelope parsing and text normalization.
//!
//! Slack varies the POST body shape by top-level `type`; only the routing
//! fields are typed here and the inner event object stays raw JSON for
//! field-by-field extraction.

use serde::Deserialize;
use std::sync::LazyLock;

/// Upper bound on an echoed handshake challenge.
const MAX_CHALLENGE_LEN: usize = 512;

/// Leading bot-mention token: `<@U123ABC>` plus trailing whitespace at the
/// start of the message.
static MENTION_PREFIX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^<@[^>]+>\s*").expect("mention regex is valid"));

/// Top-level Events API envelope.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    /// `url_verification`, `event_callback`, or something newer we ignore.
    #[serde(rename = "type")]
    pub kind: String,

    /// Present only for `url_verification`.
    pub challenge: Option<String>,

    /// Delivery id, present for `event_callback`. Stable across Slack's
    /// retries of the same delivery.
    pub event_id: Option<String>,

    /// Full event object for `event_callback`.
    pub event: Option<serde_json::Value>,
}

/// An incident report extracted from an `event_callback`, mention token
/// already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentEvent {
    pub channel: String,
    pub text: String,
}

/// Strictly validate a `url_verification` body and return its challenge.
///
/// The handshake is the one unsigned request this service answers, so the
/// accepted shape is narrow: a non-empty challenge of bounded length with no
/// control characters. Anything else is rejected.
pub fn handshake_challenge(envelope: &EventEnvelope) -> Option<&str> {
    let challenge = envelope.challenge.as_deref()?;
    if challenge.is_empty() || challenge.len() > MAX_CHALLENGE_LEN {
        return None;
    }
    if challenge.chars().any(char::is_control) {
        return None;
    }
    Some(challenge)
}

/// Extract the classifiable message from an `event_callback` event object.
///
/// Returns `None` for events that must not trigger a reply: bot-authored
/// messages (`bot_id`), message subtypes (edits, deletions, joins), and
/// events with no text or channel left after normalization.
pub fn extract_incident(event: &serde_json::Value) -> Option<IncidentEvent> {
    if event.get("bot_id").is_some() || event.get("subtype").is_some() {
        return None;
    }

    let raw_text = event.get("text").and_then(|t| t.as_str()).unwrap_or("");
    let channel = event.get("channel").and_then(|c| c.as_str()).unwrap_or("");

    let text = strip_mention(raw_text);
    if text.is_empty() || channel.is_empty() {
        return None;
    }

    Some(IncidentEvent {
        channel: channel.to_string(),
        text,
    })
}

/// Remove one leading mention token and trim surrounding whitespace.
///
/// Pure and infallible: text without a leading mention comes back unchanged
/// apart from trimming.
pub fn strip_mention(raw: &str) -> String {
    MENTION_PREFIX.replace(raw, "").trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(body: serde_json::Value) -> EventEnvelope {
        serde_json::from_value(body).unwrap()
    }

    // ── Mention stripping ─────────────────────────────────────────

    #[test]
    fn strip_removes_leading_mention() {
        assert_eq!(strip_mention("<@U123ABC> fix the router"), "fix the router");
    }

    #[test]
    fn strip_leaves_plain_text_unchanged() {
        assert_eq!(strip_mention("no mention here"), "no mention here");
    }

    #[test]
    fn strip_without_trailing_space() {
        assert_eq!(strip_mention("<@U123>deploy failed"), "deploy failed");
    }

    #[test]
    fn strip_keeps_mid_text_mentions() {
        assert_eq!(strip_mention("ask <@U456> about it"), "ask <@U456> about it");
    }

    #[test]
    fn strip_removes_only_one_leading_mention() {
        assert_eq!(strip_mention("<@U1> <@U2> help"), "<@U2> help");
    }

    #[test]
    fn strip_trims_whitespace() {
        assert_eq!(strip_mention("  padded text  "), "padded text");
        assert_eq!(strip_mention("<@U1>   "), "");
    }

    // ── Handshake shape ───────────────────────────────────────────

    #[test]
    fn handshake_accepts_well_formed_challenge() {
        let env = envelope(json!({"type": "url_verification", "challenge": "abc123"}));
        assert_eq!(handshake_challenge(&env), Some("abc123"));
    }

    #[test]
    fn handshake_rejects_missing_challenge() {
        let env = envelope(json!({"type": "url_verification"}));
        assert_eq!(handshake_challenge(&env), None);
    }

    #[test]
    fn handshake_rejects_empty_challenge() {
        let env = envelope(json!({"type": "url_verification", "challenge": ""}));
        assert_eq!(handshake_challenge(&env), None);
    }

    #[test]
    fn handshake_rejects_oversized_challenge() {
        let env = envelope(json!({
            "type": "url_verification",
            "challenge": "x".repeat(MAX_CHALLENGE_LEN + 1)
        }));
        assert_eq!(handshake_challenge(&env), None);
    }

    #[test]
    fn handshake_rejects_control_characters() {
        let env = envelope(json!({"type": "url_verification", "challenge": "abc\ndef"}));
        assert_eq!(handshake_challenge(&env), None);
    }

    // ── Incident extraction ───────────────────────────────────────

    #[test]
    fn extract_strips_mention_and_keeps_channel() {
        let event = json!({
            "type": "app_mention",
            "user": "U123",
            "text": "<@BOT> network is down",
            "channel": "C456",
            "ts": "1700000000.000100"
        });
        assert_eq!(
            extract_incident(&event),
            Some(IncidentEvent {
                channel: "C456".into(),
                text: "network is down".into()
            })
        );
    }

    #[test]
    fn extract_skips_bot_messages() {
        let event = json!({
            "type": "message",
            "bot_id": "B999",
            "text": "Incident classified as: *Other*",
            "channel": "C456"
        });
        assert_eq!(extract_incident(&event), None);
    }

    #[test]
    fn extract_skips_message_subtypes() {
        let event = json!({
            "type": "message",
            "subtype": "message_changed",
            "text": "edited text",
            "channel": "C456"
        });
        assert_eq!(extract_incident(&event), None);
    }

    #[test]
    fn extract_skips_empty_text() {
        let event = json!({"type": "message", "text": "", "channel": "C456"});
        assert_eq!(extract_incident(&event), None);
    }

    #[test]
    fn extract_skips_mention_only_text() {
        let event = json!({"type": "app_mention", "text": "<@BOT>", "channel": "C456"});
        assert_eq!(extract_incident(&event), None);
    }

    #[test]
    fn extract_skips_missing_channel() {
        let event = json!({"type": "message", "text": "db is slow"});
        assert_eq!(extract_incident(&event), None);
    }

    // ── Envelope parsing ──────────────────────────────────────────

    #[test]
    fn envelope_event_callback_fields() {
        let env = envelope(json!({
            "type": "event_callback",
            "event_id": "Ev061ABC",
            "event": {"type": "app_mention", "text": "hi", "channel": "C1"}
        }));
        assert_eq!(env.kind, "event_callback");
        assert_eq!(env.event_id.as_deref(), Some("Ev061ABC"));
        assert!(env.event.is_some());
        assert!(env.challenge.is_none());
    }

    #[test]
    fn envelope_unknown_type_still_parses() {
        let env = envelope(json!({"type": "app_rate_limited", "minute_rate_limited": 1}));
        assert_eq!(env.kind, "app_rate_limited");
        assert!(env.event.is_none());
    }

    #[test]
    fn envelope_missing_type_fails_parse() {
        let result: Result<EventEnvelope, _> =
            serde_json::from_value(json!({"challenge": "abc"}));
        assert!(result.is_err());
    }
}
