//! Refresh-ahead cache for the bearer credential

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::core::models::TokenStatus;

/// Current bearer credential and the instant it stops being trusted.
///
/// `expires_at` is always set earlier than the credential's real remote
/// expiry, so a fresh credential stays usable for the whole request.
/// Only mutated while the refresh gate is held.
#[derive(Debug, Default, Clone)]
pub struct TokenCache {
    credential: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A never-fetched cache is stale.
    pub fn is_fresh(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(expires_at) if now < expires_at)
    }

    /// Install a new credential trusted for `ttl` from `now`.
    pub fn install(&mut self, credential: impl Into<String>, now: Instant, ttl: Duration) {
        self.credential = Some(credential.into());
        self.expires_at = Some(now + ttl);
        debug!("Installed new credential, valid for {:?}", ttl);
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn status(&self, now: Instant) -> TokenStatus {
        TokenStatus {
            has_credential: self.credential.is_some(),
            fresh: self.is_fresh(now),
            expires_in: self
                .expires_at
                .and_then(|expires_at| expires_at.checked_duration_since(now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_is_stale() {
        let cache = TokenCache::new();
        assert!(!cache.is_fresh(Instant::now()));
        assert!(cache.credential().is_none());
    }

    #[test]
    fn test_window_boundaries() {
        let mut cache = TokenCache::new();
        let t = Instant::now();
        let window = Duration::from_secs(550);
        cache.install("tok", t, window);

        assert!(cache.is_fresh(t));
        assert!(cache.is_fresh(t + window - Duration::from_millis(1)));
        assert!(!cache.is_fresh(t + window));
        assert!(!cache.is_fresh(t + window + Duration::from_secs(1)));
        assert_eq!(cache.credential(), Some("tok"));
    }

    #[test]
    fn test_reinstall_replaces_credential() {
        let mut cache = TokenCache::new();
        let t = Instant::now();
        cache.install("first", t, Duration::from_secs(1));
        cache.install("second", t + Duration::from_secs(2), Duration::from_secs(1));

        assert_eq!(cache.credential(), Some("second"));
        assert!(cache.is_fresh(t + Duration::from_secs(2)));
    }

    #[test]
    fn test_status_snapshot() {
        let mut cache = TokenCache::new();
        let t = Instant::now();
        assert_eq!(
            cache.status(t),
            TokenStatus {
                has_credential: false,
                fresh: false,
                expires_in: None
            }
        );

        cache.install("tok", t, Duration::from_secs(10));
        let status = cache.status(t + Duration::from_secs(4));
        assert!(status.fresh);
        assert_eq!(status.expires_in, Some(Duration::from_secs(6)));

        let status = cache.status(t + Duration::from_secs(11));
        assert!(!status.fresh);
        assert!(status.has_credential);
        assert_eq!(status.expires_in, None);
    }
}
