//! Authentication state and the single-flight token refresh guard.
//!
//! [`AuthContext`] is created once per process and passed to everything that calls
//! the API. Getting a token follows this order:
//!
//! 1. a cached access token that is still valid is returned as is;
//! 2. without a refresh token the context logs out and yields no token;
//! 3. if a refresh is already running, the caller awaits that same refresh;
//! 4. otherwise a refresh starts and is shared with every caller arriving meanwhile.
//!
//! A failed refresh logs out, and every waiter gets `None`. The in-flight marker is
//! cleared when the refresh settles so the next caller can start a new one.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use album_core::models::{AccessToken, RefreshRequest, RefreshResponse, TokenPair};
use album_core::AppError;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;

use crate::store::{StoredCredentials, TokenStore};

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError>;
}

/// Refreshes through `POST {prefix}/auth/refresh`.
#[derive(Clone, Debug)]
pub struct HttpTokenRefresher {
    client: Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(base_url: &str, api_prefix: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!(
                "{}{}/auth/refresh",
                base_url.trim_end_matches('/'),
                api_prefix
            ),
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(if status.as_u16() == 401 || status.as_u16() == 403 {
                AppError::Unauthorized(format!("Refresh token rejected: {}", body))
            } else {
                AppError::Api {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let body: RefreshResponse = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse refresh response as JSON: {}", e))
        })?;

        Ok(body.into_token_pair(Utc::now()))
    }
}

type SharedRefresh = Shared<BoxFuture<'static, Option<AccessToken>>>;

enum RefreshState {
    Idle,
    Pending(SharedRefresh),
}

struct AuthState {
    access: Option<AccessToken>,
    refresh_token: Option<String>,
    refresh: RefreshState,
    /// Bumped by logout and explicit token changes so an older refresh cannot
    /// overwrite newer state
    generation: u64,
}

struct Inner {
    state: Mutex<AuthState>,
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn TokenStore>,
    skew: chrono::Duration,
}

/// Process-wide authentication state. Clones share the same state.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("AuthContext")
            .field("access", &state.access)
            .field("has_refresh_token", &state.refresh_token.is_some())
            .field(
                "refreshing",
                &matches!(state.refresh, RefreshState::Pending(_)),
            )
            .finish()
    }
}

impl AuthContext {
    pub fn new(
        credentials: StoredCredentials,
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn TokenStore>,
        skew: chrono::Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(AuthState {
                    access: credentials.access_token,
                    refresh_token: credentials.refresh_token,
                    refresh: RefreshState::Idle,
                    generation: 0,
                }),
                refresher,
                store,
                skew,
            }),
        }
    }

    /// Restore credentials persisted in `store`.
    pub fn load(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        skew: chrono::Duration,
    ) -> Result<Self, AppError> {
        let credentials = store.load()?.unwrap_or_default();
        tracing::debug!(
            has_refresh_token = credentials.refresh_token.is_some(),
            "Loaded stored credentials"
        );
        Ok(Self::new(credentials, refresher, store, skew))
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// A valid access token, refreshing it if needed. `None` means the caller must
    /// log in again.
    pub async fn get_access_token(&self) -> Option<AccessToken> {
        {
            let state = self.lock();
            if let Some(token) = state
                .access
                .as_ref()
                .filter(|t| t.is_valid_at(Utc::now(), self.inner.skew))
            {
                return Some(token.clone());
            }
        }
        self.refresh_access_token().await
    }

    /// Refresh the access token, joining a refresh that is already running.
    pub async fn refresh_access_token(&self) -> Option<AccessToken> {
        let pending = {
            let mut state = self.lock();
            match &state.refresh {
                RefreshState::Pending(shared) => shared.clone(),
                RefreshState::Idle => {
                    let Some(refresh_token) = state.refresh_token.clone() else {
                        drop(state);
                        tracing::info!("No refresh token available, logging out");
                        self.logout();
                        return None;
                    };
                    let shared = self
                        .clone()
                        .settle_refresh(refresh_token, state.generation)
                        .boxed()
                        .shared();
                    state.refresh = RefreshState::Pending(shared.clone());
                    shared
                }
            }
        };
        pending.await
    }

    /// Run a refresh to completion. A panicking refresher counts as a failed refresh,
    /// so the shared future always settles and the guard goes back to idle.
    async fn settle_refresh(self, refresh_token: String, generation: u64) -> Option<AccessToken> {
        let outcome = AssertUnwindSafe(self.clone().run_refresh(refresh_token, generation))
            .catch_unwind()
            .await;
        match outcome {
            Ok(token) => token,
            Err(_) => {
                let current = self.lock().generation == generation;
                if current {
                    tracing::error!("Token refresh panicked, logging out");
                    self.logout();
                }
                None
            }
        }
    }

    async fn run_refresh(self, refresh_token: String, generation: u64) -> Option<AccessToken> {
        tracing::debug!("Refreshing access token");
        let result = self.inner.refresher.refresh(&refresh_token).await;

        let credentials = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!("Discarding refresh result superseded by newer credentials");
                return state.access.clone();
            }
            state.refresh = RefreshState::Idle;

            match result {
                Ok(pair) => {
                    state.access = Some(pair.access);
                    if let Some(rotated) = pair.refresh_token {
                        state.refresh_token = Some(rotated);
                    }
                    StoredCredentials {
                        refresh_token: state.refresh_token.clone(),
                        access_token: state.access.clone(),
                    }
                }
                Err(e) => {
                    drop(state);
                    tracing::warn!(error = %e, "Token refresh failed, logging out");
                    self.logout();
                    return None;
                }
            }
        };

        if let Err(e) = self.inner.store.save(&credentials) {
            tracing::warn!(error = %e, "Failed to persist refreshed credentials");
        }
        tracing::info!("Access token refreshed");
        credentials.access_token
    }

    /// Forget every credential, in memory and in the store.
    pub fn logout(&self) {
        {
            let mut state = self.lock();
            state.access = None;
            state.refresh_token = None;
            state.refresh = RefreshState::Idle;
            state.generation += 1;
        }
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
    }

    /// Replace the credentials, e.g. after a login.
    pub fn set_tokens(&self, access: Option<AccessToken>, refresh_token: Option<String>) {
        let credentials = {
            let mut state = self.lock();
            state.access = access;
            state.refresh_token = refresh_token;
            state.refresh = RefreshState::Idle;
            state.generation += 1;
            StoredCredentials {
                refresh_token: state.refresh_token.clone(),
                access_token: state.access.clone(),
            }
        };
        if let Err(e) = self.inner.store.save(&credentials) {
            tracing::warn!(error = %e, "Failed to persist credentials");
        }
    }

    /// Drop the cached access token if it is still `rejected`, so the next
    /// [`get_access_token`](Self::get_access_token) refreshes.
    pub fn invalidate_access_token(&self, rejected: &AccessToken) {
        let mut state = self.lock();
        if state.access.as_ref() == Some(rejected) {
            state.access = None;
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.lock().refresh_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and answers after yielding, so concurrent callers overlap.
    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingRefresher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(AppError::Unauthorized("expired".to_string()));
            }
            Ok(TokenPair {
                access: AccessToken::new(
                    format!("access-{}-{}", refresh_token, call),
                    Some(Utc::now() + chrono::Duration::minutes(10)),
                ),
                refresh_token: None,
            })
        }
    }

    fn context(
        refresher: Arc<CountingRefresher>,
        store: Arc<MemoryTokenStore>,
    ) -> AuthContext {
        AuthContext::load(store, refresher, chrono::Duration::seconds(30)).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let refresher = CountingRefresher::new(false);
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save(&StoredCredentials {
                refresh_token: Some("r".to_string()),
                access_token: Some(AccessToken::new(
                    "cached",
                    Some(Utc::now() + chrono::Duration::minutes(5)),
                )),
            })
            .unwrap();
        let auth = context(refresher.clone(), store);

        let token = auth.get_access_token().await.unwrap();
        assert_eq!(token.value, "cached");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = CountingRefresher::new(false);
        let store = Arc::new(MemoryTokenStore::with_refresh_token("r"));
        let auth = context(refresher.clone(), store.clone());

        let tokens = futures::future::join_all((0..8).map(|_| {
            let auth = auth.clone();
            async move { auth.get_access_token().await }
        }))
        .await;

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        for token in &tokens {
            assert_eq!(token.as_ref().map(|t| t.value.as_str()), Some("access-r-1"));
        }
        assert_eq!(
            store
                .snapshot()
                .and_then(|c| c.access_token)
                .map(|t| t.value),
            Some("access-r-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_across_tasks_share_one_refresh() {
        let refresher = CountingRefresher::new(false);
        let auth = context(
            refresher.clone(),
            Arc::new(MemoryTokenStore::with_refresh_token("r")),
        );

        let handles = (0..8)
            .map(|_| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.get_access_token().await })
            })
            .collect::<Vec<_>>();

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap().map(|t| t.value));
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| v.as_deref() == Some("access-r-1")));
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_everyone_out() {
        let refresher = CountingRefresher::new(true);
        let store = Arc::new(MemoryTokenStore::with_refresh_token("r"));
        let auth = context(refresher.clone(), store.clone());

        let tokens = futures::future::join_all((0..4).map(|_| {
            let auth = auth.clone();
            async move { auth.get_access_token().await }
        }))
        .await;

        assert!(tokens.iter().all(Option::is_none));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!auth.has_refresh_token());
        assert_eq!(store.snapshot(), None);

        // Logged out: later calls do not hit the network again
        assert!(auth.get_access_token().await.is_none());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_forces_logout() {
        let refresher = CountingRefresher::new(false);
        let store = Arc::new(MemoryTokenStore::new());
        let auth = context(refresher.clone(), store);

        assert!(auth.get_access_token().await.is_none());
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_settled_refresh_allows_a_new_one() {
        let refresher = CountingRefresher::new(false);
        let auth = context(
            refresher.clone(),
            Arc::new(MemoryTokenStore::with_refresh_token("r")),
        );

        let first = auth.refresh_access_token().await.unwrap();
        let second = auth.refresh_access_token().await.unwrap();

        assert_eq!(first.value, "access-r-1");
        assert_eq!(second.value, "access-r-2");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_only_drops_matching_token() {
        let refresher = CountingRefresher::new(false);
        let auth = context(
            refresher.clone(),
            Arc::new(MemoryTokenStore::with_refresh_token("r")),
        );

        let first = auth.get_access_token().await.unwrap();
        auth.invalidate_access_token(&AccessToken::new("someone-else", None));
        assert_eq!(auth.get_access_token().await.unwrap(), first);

        auth.invalidate_access_token(&first);
        let second = auth.get_access_token().await.unwrap();
        assert_ne!(second, first);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    /// Panics on its first call, then behaves.
    struct PanicOnceRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for PanicOnceRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(5)).await;
            if call == 1 {
                panic!("refresher blew up");
            }
            Ok(TokenPair {
                access: AccessToken::new(format!("access-{}-{}", refresh_token, call), None),
                refresh_token: None,
            })
        }
    }

    #[tokio::test]
    async fn test_panicking_refresh_settles_and_logs_out() {
        let refresher = Arc::new(PanicOnceRefresher {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryTokenStore::with_refresh_token("r"));
        let auth = AuthContext::load(
            store.clone(),
            refresher.clone(),
            chrono::Duration::seconds(30),
        )
        .unwrap();

        let tokens = futures::future::join_all((0..3).map(|_| {
            let auth = auth.clone();
            async move { auth.get_access_token().await }
        }))
        .await;
        assert!(tokens.iter().all(Option::is_none));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!auth.has_refresh_token());
        assert_eq!(store.snapshot(), None);

        // Same guard, new login: the refresh runs instead of replaying the panic
        auth.set_tokens(None, Some("r2".to_string()));
        let token = auth.get_access_token().await.unwrap();
        assert_eq!(token.value, "access-r2-2");
    }

    #[tokio::test]
    async fn test_logout_during_refresh_discards_result() {
        let refresher = CountingRefresher::new(false);
        let auth = context(
            refresher.clone(),
            Arc::new(MemoryTokenStore::with_refresh_token("r")),
        );

        let waiter = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.get_access_token().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        auth.logout();

        assert!(waiter.await.unwrap().is_none());
        assert!(!auth.has_refresh_token());
    }
}
