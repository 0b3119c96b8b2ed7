use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

struct OtpEntry {
    code: String,
    issued_at: Instant,
}

/// Short-lived keyed store for one-time codes: one code per email, explicit
/// TTL, single-use consumption. Expired entries are purged lazily on access,
/// never swept.
pub struct OtpStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a fresh 6-digit code for the email, replacing any outstanding
    /// one, and returns it for delivery.
    pub async fn issue(&self, email: &str) -> String {
        self.issue_at(email, Instant::now()).await
    }

    /// Consumes the code for the email. Returns true only for a matching,
    /// unexpired code; success removes the entry so a replay fails.
    pub async fn verify(&self, email: &str, code: &str) -> bool {
        self.verify_at(email, code, Instant::now()).await
    }

    async fn issue_at(&self, email: &str, now: Instant) -> String {
        let code = {
            let mut rng = rand::thread_rng();
            rng.gen_range(100_000..=999_999).to_string()
        };
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| now.duration_since(entry.issued_at) < self.ttl);
        entries.insert(
            email.to_string(),
            OtpEntry {
                code: code.clone(),
                issued_at: now,
            },
        );
        code
    }

    async fn verify_at(&self, email: &str, code: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| now.duration_since(entry.issued_at) < self.ttl);
        match entries.get(email) {
            Some(entry) if entry.code == code => {
                entries.remove(email);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(120);

    #[tokio::test]
    async fn issued_code_verifies_once() {
        let store = OtpStore::new(TTL);
        let code = store.issue("a@b.com").await;
        assert!(store.verify("a@b.com", &code).await);
        // consumed on success
        assert!(!store.verify("a@b.com", &code).await);
    }

    #[tokio::test]
    async fn wrong_code_is_rejected_and_not_consumed() {
        let store = OtpStore::new(TTL);
        let code = store.issue("a@b.com").await;
        assert!(!store.verify("a@b.com", "000000").await);
        assert!(store.verify("a@b.com", &code).await);
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let store = OtpStore::new(TTL);
        let issued = Instant::now();
        let code = store.issue_at("a@b.com", issued).await;
        assert!(!store.verify_at("a@b.com", &code, issued + TTL).await);
    }

    #[tokio::test]
    async fn code_just_inside_ttl_still_verifies() {
        let store = OtpStore::new(TTL);
        let issued = Instant::now();
        let code = store.issue_at("a@b.com", issued).await;
        assert!(
            store
                .verify_at("a@b.com", &code, issued + TTL - Duration::from_secs(1))
                .await
        );
    }

    #[tokio::test]
    async fn reissuing_replaces_the_outstanding_code() {
        let store = OtpStore::new(TTL);
        let first = store.issue("a@b.com").await;
        let second = store.issue("a@b.com").await;
        if first != second {
            assert!(!store.verify("a@b.com", &first).await);
        }
        assert!(store.verify("a@b.com", &second).await);
    }

    #[tokio::test]
    async fn codes_are_six_digits() {
        let store = OtpStore::new(TTL);
        for _ in 0..20 {
            let code = store.issue("a@b.com").await;
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
