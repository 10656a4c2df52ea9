// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-keyed cache of Microsoft access tokens.
//!
//! The cache answers one question: "is there a usable token for this session
//! right now?". Anything that goes wrong while answering it (missing record,
//! corrupt file, expired token, failed refresh) collapses into `None`, and an
//! expired token is always removed so it is never handed out again. Only
//! `save_token` reports errors, since callers must know when a credential
//! failed to persist.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{CachedToken, TokenGrant};
use crate::time_utils::{Clock, SystemClock};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Exchanges a refresh token for a new grant.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;
}

/// Refresher used in production today: refresh against Microsoft is not
/// implemented, so an expired token always forces a new sign-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshUnsupported;

#[async_trait]
impl TokenRefresher for RefreshUnsupported {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AppError> {
        tracing::warn!("Token refresh requested but not implemented; re-authentication required");
        Err(AppError::RefreshUnavailable)
    }
}

/// Per-key locks serializing access to a single slot.
pub type SlotLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Token cache over a [`TokenStore`].
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn TokenStore>,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    locks: SlotLocks,
}

impl TokenCache {
    /// Cache backed by `store`, with the wall clock and no refresh support.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_parts(store, Arc::new(RefreshUnsupported), Arc::new(SystemClock))
    }

    pub fn with_parts(
        store: Arc<dyn TokenStore>,
        refresher: Arc<dyn TokenRefresher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            refresher,
            clock,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn slot_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the session's access token if one is usable now.
    ///
    /// An expired token is refreshed when a refresh token exists; if that
    /// fails, or there is nothing to refresh with, the slot is cleared.
    pub async fn get_valid_token(&self, key: &str) -> Option<String> {
        let lock = self.slot_lock(key);
        let _guard = lock.lock().await;

        let cached = match self.store.load(key) {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Cached token unreadable, treating as miss");
                return None;
            }
        };

        let now = self.clock.now();
        if cached.is_valid_at(now) {
            return Some(cached.access_token);
        }

        tracing::info!(expired_at = %cached.expires_at, "Cached token expired");

        let mut refreshed = None;
        if cached.has_refresh_token() {
            match self.refresher.refresh(&cached.refresh_token).await {
                Ok(grant) => {
                    let refresh_token = grant
                        .refresh_token
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| cached.refresh_token.clone());
                    let token = CachedToken::issued_at(
                        now,
                        grant.access_token,
                        refresh_token,
                        grant.expires_in,
                    );
                    match token {
                        Ok(token) => match self.store.save(key, &token) {
                            Ok(()) => {
                                tracing::info!("Token refreshed");
                                return Some(token.access_token);
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to persist refreshed token");
                                refreshed = Some(token.access_token);
                            }
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "Refreshed token unusable, clearing cache");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Token refresh failed, clearing cache");
                }
            }
        }

        self.remove_slot(key);
        refreshed
    }

    /// Persist a token for the session, replacing whatever was there.
    ///
    /// The stored expiry is `expires_in_secs` from now minus a five minute
    /// margin.
    pub async fn save_token(
        &self,
        key: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
    ) -> Result<(), AppError> {
        let lock = self.slot_lock(key);
        let _guard = lock.lock().await;

        let token =
            CachedToken::issued_at(self.clock.now(), access_token, refresh_token, expires_in_secs)?;
        self.store.save(key, &token)?;

        tracing::debug!(expires_at = %token.expires_at, "Token cached");
        Ok(())
    }

    /// Persist a grant returned by the provider.
    pub async fn save_grant(&self, key: &str, grant: &TokenGrant) -> Result<(), AppError> {
        self.save_token(
            key,
            &grant.access_token,
            grant.refresh_token.as_deref().unwrap_or(""),
            grant.expires_in,
        )
        .await
    }

    /// Drop the session's token. Clearing an empty slot is a no-op.
    pub async fn clear_token(&self, key: &str) {
        let lock = self.slot_lock(key);
        let _guard = lock.lock().await;
        self.remove_slot(key);
    }

    /// Whether [`get_valid_token`](Self::get_valid_token) yields a token.
    pub async fn is_token_valid(&self, key: &str) -> bool {
        self.get_valid_token(key).await.is_some()
    }

    // Caller must hold the slot lock.
    fn remove_slot(&self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            tracing::warn!(error = %e, "Failed to remove cached token");
        }
    }
}
