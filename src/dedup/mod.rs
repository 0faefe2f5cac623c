//! Webhook deduplication module
//!
//! Messaging gateways redeliver: retries, reconnects and at-least-once
//! queues all produce the same message twice. The coordinator claims a
//! fingerprint of each delivery in Redis before processing and caches the
//! final reply under the same key, so duplicates inside the TTL window get
//! the original reply verbatim instead of a second LLM call.
//!
//! The cache is best effort. When Redis is missing or down the message is
//! processed without deduplication; a delivery is never dropped because
//! the cache was unavailable.

use sha2::Digest;
use sha2::Sha256;

pub mod cache;
pub mod coordinator;

pub use cache::DedupCache;
pub use coordinator::DedupCoordinator;

/// Value stored while the first delivery is still being processed
pub(crate) const IN_FLIGHT_MARKER: &str = "__processing__";

/// Delivery fingerprint: equal for byte-identical (user, platform, text)
/// triples and for nothing else. The separator byte keeps field
/// boundaries unambiguous.
pub fn fingerprint(user_id: &str, platform: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(platform.as_bytes());
    hasher.update([0x1f]);
    hasher.update(message.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint("62812", "whatsapp", "Apa itu KSJPS?");
        let b = fingerprint("62812", "whatsapp", "Apa itu KSJPS?");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_any_field() {
        let base = fingerprint("62812", "whatsapp", "halo");
        assert_ne!(base, fingerprint("62813", "whatsapp", "halo"));
        assert_ne!(base, fingerprint("62812", "instagram", "halo"));
        assert_ne!(base, fingerprint("62812", "whatsapp", "halo!"));
    }

    #[test]
    fn test_fingerprint_fields_do_not_bleed() {
        // Without a separator these two would collide
        let a = fingerprint("ab", "c", "halo");
        let b = fingerprint("a", "bc", "halo");
        assert_ne!(a, b);
    }
}
