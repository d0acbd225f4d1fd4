//! Authenticated session handling
//!
//! A [`Session`] is an explicit value passed by reference into the importer
//! and the matcher. [`SessionManager`] acquires one lazily and refreshes it
//! once it expires.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::traits::CredentialProvider;
use crate::types::*;

/// An authenticated user acting within one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// User recorded on reconciliations performed with this session
    pub user_id: String,
    /// Company scope all reads and writes are addressed to
    pub tenant_id: String,
    /// Opaque bearer token handed to the storage backend
    pub token: String,
    pub expires_at: NaiveDateTime,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        token: impl Into<String>,
        expires_at: NaiveDateTime,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the session is unusable at `now`, counting `skew` as already expired
    pub fn is_expired_at(&self, now: NaiveDateTime, skew: Duration) -> bool {
        now + skew >= self.expires_at
    }
}

/// Caches the current session and refreshes it when it expires
///
/// The cache lock is held while the provider is called, so concurrent callers
/// wait for one acquire or refresh instead of starting their own.
pub struct SessionManager<P: CredentialProvider> {
    provider: P,
    current: Mutex<Option<Session>>,
    skew: Duration,
}

impl<P: CredentialProvider> SessionManager<P> {
    /// Create a manager that treats sessions as expired 30 seconds early
    pub fn new(provider: P) -> Self {
        Self::with_skew(provider, Duration::seconds(30))
    }

    pub fn with_skew(provider: P, skew: Duration) -> Self {
        Self {
            provider,
            current: Mutex::new(None),
            skew,
        }
    }

    /// Return a valid session, acquiring or refreshing it as needed
    pub async fn session(&self) -> ReconciliationResult<Session> {
        let mut current = self.current.lock().await;
        let now = chrono::Utc::now().naive_utc();

        let session = match current.as_ref() {
            Some(session) if !session.is_expired_at(now, self.skew) => {
                return Ok(session.clone())
            }
            Some(expired) => {
                debug!(user_id = %expired.user_id, "session expired, refreshing");
                self.provider.refresh(expired).await?
            }
            None => {
                debug!("no session cached, acquiring");
                self.provider.acquire().await?
            }
        };

        info!(
            user_id = %session.user_id,
            tenant_id = %session.tenant_id,
            expires_at = %session.expires_at,
            "session established"
        );
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session so the next call acquires a new one
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        acquired: AtomicUsize,
        refreshed: AtomicUsize,
        lifetime: Duration,
    }

    impl CountingProvider {
        fn new(lifetime: Duration) -> Self {
            Self {
                acquired: AtomicUsize::new(0),
                refreshed: AtomicUsize::new(0),
                lifetime,
            }
        }

        fn issue(&self, token: String) -> Session {
            Session::new(
                "user-1",
                "tenant-1",
                token,
                chrono::Utc::now().naive_utc() + self.lifetime,
            )
        }
    }

    #[async_trait]
    impl CredentialProvider for CountingProvider {
        async fn acquire(&self) -> ReconciliationResult<Session> {
            let n = self.acquired.fetch_add(1, Ordering::SeqCst);
            // Let other callers run while the credential request is in flight
            tokio::task::yield_now().await;
            Ok(self.issue(format!("acquired-{n}")))
        }

        async fn refresh(&self, _expired: &Session) -> ReconciliationResult<Session> {
            let n = self.refreshed.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(self.issue(format!("refreshed-{n}")))
        }
    }

    #[tokio::test]
    async fn test_session_acquired_once_while_valid() {
        let manager = SessionManager::new(CountingProvider::new(Duration::hours(1)));

        let first = manager.session().await.unwrap();
        let second = manager.session().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(manager.provider.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(manager.provider.refreshed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed() {
        // Issued sessions expire inside the skew window, so every reuse refreshes
        let manager = SessionManager::with_skew(
            CountingProvider::new(Duration::seconds(10)),
            Duration::minutes(1),
        );

        let first = manager.session().await.unwrap();
        let second = manager.session().await.unwrap();

        assert_eq!(first.token, "acquired-0");
        assert_eq!(second.token, "refreshed-0");
        assert_eq!(manager.provider.refreshed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_acquire() {
        let manager = SessionManager::new(CountingProvider::new(Duration::hours(1)));

        manager.session().await.unwrap();
        manager.invalidate().await;
        let session = manager.session().await.unwrap();

        assert_eq!(session.token, "acquired-1");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_acquire() {
        let manager = SessionManager::new(CountingProvider::new(Duration::hours(1)));

        let (first, second) = tokio::join!(manager.session(), manager.session());

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(manager.provider.acquired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let manager = SessionManager::with_skew(
            CountingProvider::new(Duration::minutes(2)),
            Duration::minutes(1),
        );
        manager.session().await.unwrap();

        // Age the cached session past the skew window
        if let Some(cached) = manager.current.lock().await.as_mut() {
            cached.expires_at = chrono::Utc::now().naive_utc();
        }
        let (first, second) = tokio::join!(manager.session(), manager.session());

        assert_eq!(first.unwrap().token, "refreshed-0");
        assert_eq!(second.unwrap().token, "refreshed-0");
        assert_eq!(manager.provider.refreshed.load(Ordering::SeqCst), 1);
    }
}
