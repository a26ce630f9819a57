//! Short-lived seen-event cache for duplicate deliveries.
//!
//! Slack redelivers events it believes were not acknowledged in time, and a
//! classification reply posted twice into an incident channel is noise.
//! Deliveries are deduplicated on their `event_id` within a fixed TTL; the
//! cache is bounded and pruned in place, no background sweeper.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a delivery id is remembered. Matches the request replay window,
/// which also bounds how late Slack can redeliver a signed request.
const SEEN_TTL: Duration = Duration::from_secs(300);

/// Hard cap on tracked ids. When full, expired entries are pruned first; if
/// the cache is still full the event is processed without being tracked,
/// preventing unbounded allocations.
const MAX_ENTRIES: usize = 10_000;

/// Bounded TTL cache of recently seen delivery ids.
///
/// State is behind an internal `Mutex` so the cache can be shared via `Arc`
/// and called from `&self` contexts in the request handler.
pub struct SeenEvents {
    entries: Mutex<HashMap<String, Instant>>,
}

impl SeenEvents {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a delivery id. Returns `true` when the id is fresh and the
    /// caller should process the event, `false` when it was already seen
    /// within the TTL.
    pub fn first_seen(&self, event_id: &str) -> bool {
        self.first_seen_at(event_id, Instant::now())
    }

    fn first_seen_at(&self, event_id: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().expect("seen-events mutex poisoned");

        if let Some(stamp) = entries.get(event_id) {
            if now.saturating_duration_since(*stamp) < SEEN_TTL {
                return false;
            }
        }

        if entries.len() >= MAX_ENTRIES {
            entries.retain(|_, stamp| now.saturating_duration_since(*stamp) < SEEN_TTL);
            if entries.len() >= MAX_ENTRIES {
                tracing::warn!(
                    capacity = MAX_ENTRIES,
                    "seen-event cache at capacity; processing without tracking"
                );
                return true;
            }
        }

        entries.insert(event_id.to_string(), now);
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
