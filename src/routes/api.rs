// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for goals, weeks and To Do lists.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthSession;
use crate::models::goal::parse_start_date;
use crate::services::goals::ListWithTasks;
use crate::services::{compute_week, CurrentWeekReport, WeekProgress};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Routes callable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/week", get(get_week))
}

/// Routes that need a session JWT.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals/current-week", get(get_current_week))
        .route("/api/lists", get(get_lists))
        .route("/api/auth/status", get(get_auth_status))
        .route("/api/auth/logout", post(logout))
}

/// Look up the session's Microsoft token or ask the user to sign in again.
async fn access_token(state: &AppState, session: &AuthSession) -> Result<String> {
    state
        .token_cache
        .get_valid_token(&session.session_id)
        .await
        .ok_or(AppError::ReauthenticationRequired)
}

/// Drop the cached token when Graph rejects it.
async fn forget_rejected_token<T>(
    state: &AppState,
    session: &AuthSession,
    result: Result<T>,
) -> Result<T> {
    match result {
        Err(e) if e.is_graph_token_error() => {
            tracing::info!("Graph rejected cached token, clearing session");
            state.token_cache.clear_token(&session.session_id).await;
            Err(AppError::ReauthenticationRequired)
        }
        other => other,
    }
}

// ─── Week ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WeekQuery {
    start_date: Option<String>,
}

/// Progress for an explicit start date.
async fn get_week(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeekProgress>> {
    let raw = query
        .start_date
        .ok_or_else(|| AppError::BadRequest("start_date is required".to_string()))?;
    let start_date = parse_start_date(&raw)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid start_date: {}", raw)))?;

    let today = state.clock.now().date_naive();
    Ok(Json(compute_week(start_date, today)))
}

/// Progress derived from the earliest due date in the user's To Do lists.
async fn get_current_week(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<CurrentWeekReport>> {
    let token = access_token(&state, &session).await?;
    let today = state.clock.now().date_naive();

    let result = state.goal_service.current_week(&token, today).await;
    let report = forget_rejected_token(&state, &session, result).await?;

    tracing::info!(
        current_week = report.progress.current_week,
        start_date = %report.progress.start_date,
        "Current week computed from task due dates"
    );

    Ok(Json(report))
}

// ─── Lists ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ListsResponse {
    total_lists: usize,
    lists: Vec<ListWithTasks>,
}

/// All To Do lists with their tasks.
async fn get_lists(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ListsResponse>> {
    let token = access_token(&state, &session).await?;

    let result = state.goal_service.lists_with_tasks(&token).await;
    let lists = forget_rejected_token(&state, &session, result).await?;

    Ok(Json(ListsResponse {
        total_lists: lists.len(),
        lists,
    }))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Serialize)]
struct AuthStatusResponse {
    authenticated: bool,
}

/// Whether the session still holds a usable Microsoft token.
async fn get_auth_status(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: state.token_cache.is_token_valid(&session.session_id).await,
    })
}

#[derive(Serialize)]
struct LogoutResponse {
    message: String,
}

/// Forget the session's Microsoft token.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
) -> Json<LogoutResponse> {
    state.token_cache.clear_token(&session.session_id).await;
    tracing::info!("Session signed out");

    Json(LogoutResponse {
        message: "Signed out".to_string(),
    })
}
