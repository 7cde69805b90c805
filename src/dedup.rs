//! Time-windowed duplicate suppression.
//!
//! One table per execution context; never persisted. Timestamps are
//! milliseconds supplied by the caller (`Date.now()` in the browser), which
//! keeps the table deterministic under test.

use std::collections::HashMap;
use std::time::Duration;

use crate::payload::NotificationSignature;

/// Signature -> first-seen timestamp, with lazy TTL eviction.
#[derive(Debug)]
pub struct DedupTable {
    ttl_ms: u64,
    seen: HashMap<NotificationSignature, u64>,
}

impl DedupTable {
    /// Create an empty table with the given window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            seen: HashMap::new(),
        }
    }

    /// Dedup window.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Record `signature` at `now_ms` unless it was seen within the window.
    ///
    /// Returns `true` when the caller should display. Stale entries are
    /// evicted on every call.
    pub fn accept(&mut self, signature: &NotificationSignature, now_ms: u64) -> bool {
        let ttl = self.ttl_ms;
        self.seen
            .retain(|_, seen_at| now_ms.saturating_sub(*seen_at) <= ttl);

        if let Some(&seen_at) = self.seen.get(signature) {
            if now_ms.saturating_sub(seen_at) < ttl {
                return false;
            }
        }

        self.seen.insert(signature.clone(), now_ms);
        true
    }

    /// Entries currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
