//! Slack request signature verification.
//!
//! Slack signs every Events API delivery with HMAC-SHA256 over the base
//! string `v0:{timestamp}:{raw body}` using the app's signing secret, and
//! sends the result as `x-slack-signature` next to
//! `x-slack-request-timestamp`. Requests whose timestamp falls outside the
//! replay window are rejected before any signature math happens.
//!
//! The raw body bytes must be the payload exactly as received; a
//! re-serialized parse is not guaranteed byte-identical and will not verify.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Maximum allowed age (or clock skew into the future) of a signed request,
/// in seconds.
pub const REPLAY_WINDOW_SECS: u64 = 300;

/// Verify a Slack request signature.
///
/// `timestamp` and `signature` are the raw header values; an absent header
/// is a verification failure, not an error. `now` is Unix seconds, injected
/// so tests control the clock. Every rejection logs its specific cause.
pub fn verify(
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    secret: &str,
    now: u64,
) -> bool {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        tracing::warn!("signature: missing timestamp or signature header");
        return false;
    };

    let Ok(ts) = timestamp.parse::<u64>() else {
        tracing::warn!("signature: unparseable timestamp {timestamp:?}");
        return false;
    };

    if now.abs_diff(ts) > REPLAY_WINDOW_SECS {
        tracing::warn!("signature: timestamp {ts} outside replay window (now {now})");
        return false;
    }

    let expected = compute(timestamp, body, secret);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        tracing::warn!("signature: mismatch");
        return false;
    }

    true
}

/// Compute the expected signature for a request: `v0=<hex digest>`.
pub fn compute(timestamp: &str, body: &[u8], secret: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
