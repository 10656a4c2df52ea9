// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session JWT middleware.
//!
//! The JWT issued after sign-in identifies the session whose Microsoft token
//! sits in the token cache. It carries no Microsoft credentials itself.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session lifetime: the 12-week program plus a week of slack.
const SESSION_TTL_SECS: usize = 13 * 7 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (session ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated session extracted from the JWT.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: String,
}

/// Middleware that requires a valid session JWT.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let session_id = verify_jwt(token, &state.config.session_signing_key, state.clock.now())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(AuthSession { session_id });

    Ok(next.run(request).await)
}

/// Decode a session JWT, returning its session ID if it has not expired at `now`.
pub fn verify_jwt(token: &str, signing_key: &[u8], now: DateTime<Utc>) -> Option<String> {
    let key = DecodingKey::from_secret(signing_key);
    // Expiry is checked against the application clock below
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;

    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    if claims.exp <= unix_secs(now) {
        return None;
    }
    Some(claims.sub).filter(|s| !s.is_empty())
}

/// Create a JWT for a session issued at `now`.
pub fn create_jwt(
    session_id: &str,
    signing_key: &[u8],
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let iat = unix_secs(now);
    let claims = Claims {
        sub: session_id.to_string(),
        iat,
        exp: iat + SESSION_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

fn unix_secs(now: DateTime<Utc>) -> usize {
    usize::try_from(now.timestamp()).unwrap_or(0)
}
