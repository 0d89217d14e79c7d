//! Store key and topic builders for every lobby record.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses. Provider-level prefixes
//! (for example the Redis `key_prefix`) are applied on top of these.

use arcade_core::types::{ChallengeId, SessionId};

// ── Presence keys ──────────────────────────────────────────

/// Presence record of a user.
pub fn presence(user_id: &str) -> String {
    format!("presence:{user_id}")
}

/// Pattern matching every presence record.
pub fn presence_pattern() -> String {
    "presence:*".to_string()
}

/// Extract the user id from a presence key.
pub fn presence_user(key: &str) -> Option<&str> {
    key.strip_prefix("presence:")
}

// ── Challenge keys ─────────────────────────────────────────

/// Challenge record by ID.
pub fn challenge(challenge_id: ChallengeId) -> String {
    format!("challenge:{challenge_id}")
}

/// Guard key for a pending pairwise challenge between two users.
///
/// The pair is ordered so both directions map to the same key.
pub fn challenge_pair(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("challenge:pair:{lo}:{hi}")
}

/// Queue of challenge ids a user has received.
pub fn challenges_received(user_id: &str) -> String {
    format!("challenges:received:{user_id}")
}

/// Queue of challenge ids a user has sent.
pub fn challenges_sent(user_id: &str) -> String {
    format!("challenges:sent:{user_id}")
}

// ── Session keys ───────────────────────────────────────────

/// Session record by ID.
pub fn session(session_id: SessionId) -> String {
    format!("session:{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_order_independent() {
        assert_eq!(challenge_pair("bob", "alice"), challenge_pair("alice", "bob"));
        assert_eq!(challenge_pair("alice", "bob"), "challenge:pair:alice:bob");
    }

    #[test]
    fn test_presence_user_roundtrip() {
        let key = presence("u-42");
        assert_eq!(presence_user(&key), Some("u-42"));
        assert_eq!(presence_user("session:1"), None);
    }
}
