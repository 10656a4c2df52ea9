// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth `state` parameter handling and goal groups awaiting sign-in.
//!
//! The state carries a fresh session ID and an issue timestamp, signed with
//! HMAC-SHA256. A goal group submitted before sign-in is parked under that
//! session ID and picked up by the callback, so concurrent sign-ins never
//! see each other's plans.

use crate::error::AppError;
use crate::models::GoalGroup;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a sign-in may take before its state and parked plan expire.
pub const STATE_MAX_AGE_SECS: i64 = 10 * 60;

/// Decoded, verified OAuth state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub session_id: String,
    pub issued_at: DateTime<Utc>,
}

/// Generate a random 128-bit session ID, hex encoded.
pub fn new_session_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(hex::encode(bytes))
}

/// Encode and sign a state value: `base64url("session|millis_hex|sig_hex")`.
pub fn sign_state(
    session_id: &str,
    issued_at: DateTime<Utc>,
    secret: &[u8],
) -> Result<String, AppError> {
    let payload = format!("{}|{:x}", session_id, issued_at.timestamp_millis());

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify signature and age of a state value.
pub fn verify_state(state: &str, secret: &[u8], now: DateTime<Utc>) -> Option<OAuthState> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [session_id, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{}|{}", session_id, timestamp_hex);
    let signature = hex::decode(signature_hex).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let millis = i64::from_str_radix(timestamp_hex, 16).ok()?;
    let issued_at = DateTime::from_timestamp_millis(millis)?;
    let age = now - issued_at;
    if age > Duration::seconds(STATE_MAX_AGE_SECS) || age < Duration::seconds(-60) {
        tracing::warn!(age_secs = age.num_seconds(), "OAuth state outside allowed age");
        return None;
    }

    Some(OAuthState {
        session_id: session_id.to_string(),
        issued_at,
    })
}

#[derive(Debug, Clone)]
struct PendingPlan {
    group: GoalGroup,
    created_at: DateTime<Utc>,
}

/// Goal groups waiting for their owner to finish signing in.
#[derive(Debug, Default)]
pub struct PendingPlans {
    plans: DashMap<String, PendingPlan>,
}

impl PendingPlans {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a goal group under a session ID, dropping stale entries.
    pub fn insert(&self, session_id: &str, group: GoalGroup, now: DateTime<Utc>) {
        self.purge_expired(now);
        self.plans.insert(
            session_id.to_string(),
            PendingPlan {
                group,
                created_at: now,
            },
        );
    }

    /// Remove and return the session's goal group if it has not expired.
    pub fn take(&self, session_id: &str, now: DateTime<Utc>) -> Option<GoalGroup> {
        let (_, plan) = self.plans.remove(session_id)?;
        if now - plan.created_at > Duration::seconds(STATE_MAX_AGE_SECS) {
            return None;
        }
        Some(plan.group)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.plans
            .retain(|_, plan| now - plan.created_at <= Duration::seconds(STATE_MAX_AGE_SECS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    const SECRET: &[u8] = b"secret_key";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap()
    }

    fn group() -> GoalGroup {
        GoalGroup {
            goal_group_name: "Q1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            goals: vec![],
        }
    }

    #[test]
    fn test_verify_state_success() {
        let state = sign_state("sess1", now(), SECRET).unwrap();
        let verified = verify_state(&state, SECRET, now() + Duration::seconds(30)).unwrap();

        assert_eq!(verified.session_id, "sess1");
        assert_eq!(verified.issued_at, now());
    }

    #[test]
    fn test_verify_state_wrong_secret() {
        let state = sign_state("sess1", now(), SECRET).unwrap();
        assert_eq!(verify_state(&state, b"wrong_key", now()), None);
    }

    #[test]
    fn test_verify_state_tampered_session() {
        let state = sign_state("sess1", now(), SECRET).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(decoded.replacen("sess1", "sess2", 1));

        assert_eq!(verify_state(&forged, SECRET, now()), None);
    }

    #[test]
    fn test_verify_state_expired() {
        let state = sign_state("sess1", now(), SECRET).unwrap();
        let later = now() + Duration::seconds(STATE_MAX_AGE_SECS + 1);
        assert_eq!(verify_state(&state, SECRET, later), None);
    }

    #[test]
    fn test_verify_state_malformed() {
        let encoded = URL_SAFE_NO_PAD.encode("invalid|format");
        assert_eq!(verify_state(&encoded, SECRET, now()), None);
        assert_eq!(verify_state("not base64 !!", SECRET, now()), None);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = new_session_id().unwrap();
        let b = new_session_id().unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_pending_plan_taken_once() {
        let plans = PendingPlans::new();
        plans.insert("s", group(), now());

        assert!(plans.take("s", now()).is_some());
        assert!(plans.take("s", now()).is_none());
    }

    #[test]
    fn test_pending_plan_expires() {
        let plans = PendingPlans::new();
        plans.insert("old", group(), now());

        let later = now() + Duration::seconds(STATE_MAX_AGE_SECS + 5);
        assert!(plans.take("old", later).is_none());

        plans.insert("a", group(), now());
        plans.insert("b", group(), later);
        assert_eq!(plans.len(), 1);
    }
}
