// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token records.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds shaved off the provider's stated lifetime before a token is
/// considered expired.
pub const EXPIRY_MARGIN_SECS: i64 = 5 * 60;

/// Default token lifetime when the provider does not state one.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Access token persisted by the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    pub access_token: String,
    /// Empty when the provider issued no refresh token
    #[serde(default)]
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build a record whose expiry is `expires_in_secs` from `now`, minus the margin.
    ///
    /// `expires_in_secs` comes from the provider; a lifetime that does not fit
    /// in a timestamp is rejected.
    pub fn issued_at(
        now: DateTime<Utc>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Result<Self, AppError> {
        let expires_at = expires_in_secs
            .checked_sub(EXPIRY_MARGIN_SECS)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AppError::GraphApi(format!(
                    "Token lifetime out of range: {} seconds",
                    expires_in_secs
                ))
            })?;

        Ok(Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Tokens handed out by the provider after a code exchange or refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    DEFAULT_EXPIRES_IN_SECS
}
