//! Logout revocation list.
//!
//! Process-local. Entries are keyed by the SHA-256 of the token and carry the
//! token's own expiry, so [`RevocationList::purge_expired`] can drop entries
//! that would fail verification anyway.

use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Default)]
pub struct RevocationList {
    entries: DashMap<String, i64>,
}

fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `token` invalid until `expires_at` (unix seconds). Idempotent.
    pub fn revoke(&self, token: &str, expires_at: i64) {
        self.entries.insert(fingerprint(token), expires_at);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.entries.contains_key(&fingerprint(token))
    }

    /// Drop entries whose token has expired. A token still verifies during
    /// its `exp` second, so that entry is kept. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now().timestamp())
    }

    pub fn purge_expired_at(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at >= now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "purged revoked tokens");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token;
    use crate::models::auth::Role;
    use chrono::Duration;
    use std::sync::Arc;

    #[test]
    fn revoke_is_idempotent() {
        let list = RevocationList::new();
        list.revoke("tok", 100);
        list.revoke("tok", 100);
        assert!(list.is_revoked("tok"));
        assert!(!list.is_revoked("other"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn purge_drops_only_expired() {
        let list = RevocationList::new();
        list.revoke("old", 100);
        list.revoke("new", 300);
        assert_eq!(list.purge_expired_at(200), 1);
        assert!(!list.is_revoked("old"));
        assert!(list.is_revoked("new"));
    }

    #[test]
    fn purge_keeps_entry_during_expiry_second() {
        let secret = b"revocation-secret";
        let (token, claims) =
            issue_token("abc", Role::Customer, secret, Duration::seconds(0)).unwrap();
        let list = RevocationList::new();
        list.revoke(&token, claims.exp);

        assert_eq!(list.purge_expired_at(claims.exp), 0);
        assert!(list.is_revoked(&token));
        assert_eq!(list.purge_expired_at(claims.exp + 1), 1);
        assert!(!list.is_revoked(&token));
    }

    #[tokio::test]
    async fn concurrent_revoke_and_check() {
        let list = Arc::new(RevocationList::new());
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let list = Arc::clone(&list);
                tokio::spawn(async move {
                    let token = format!("token-{i}");
                    list.revoke(&token, i64::MAX);
                    list.is_revoked(&token)
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(list.len(), 32);
    }
}
