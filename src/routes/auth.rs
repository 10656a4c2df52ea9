// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft sign-in routes.
//!
//! Every sign-in gets a fresh session ID carried through the signed OAuth
//! `state`. A goal group posted to `/api/goals/create` is parked under that
//! session ID and created in To Do once the callback arrives.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::GoalGroup;
use crate::services::oauth_state::{new_session_id, sign_state, verify_state};
use crate::services::GoalCreationSummary;
use crate::AppState;

pub fn routes(callback_path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals/create", post(create_goals))
        .route("/auth/microsoft/login", get(login))
        .route(callback_path, get(auth_callback))
}

/// Where to send the user to sign in.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub message: String,
    pub auth_url: String,
}

/// Start a sign-in and return its authorization URL.
fn start_sign_in(state: &AppState) -> Result<(String, String)> {
    let session_id = new_session_id()?;
    let oauth_state = sign_state(
        &session_id,
        state.clock.now(),
        &state.config.session_signing_key,
    )?;
    let auth_url = state.goal_service.graph().authorization_url(&oauth_state);
    Ok((session_id, auth_url))
}

/// Accept a goal group and hand back the sign-in URL that will create it.
async fn create_goals(
    State(state): State<Arc<AppState>>,
    Json(group): Json<GoalGroup>,
) -> Result<Json<AuthUrlResponse>> {
    group
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if let Some((goal, index)) = group.first_blank_task() {
        return Err(AppError::BadRequest(format!(
            "Goal '{}' has an empty task at position {}",
            goal,
            index + 1
        )));
    }

    let (session_id, auth_url) = start_sign_in(&state)?;

    tracing::info!(
        goal_group = %group.goal_group_name,
        goals = group.goals.len(),
        tasks = group.task_count(),
        "Goal group parked until sign-in completes"
    );
    state
        .pending_plans
        .insert(&session_id, group, state.clock.now());

    Ok(Json(AuthUrlResponse {
        message: "Open the URL in your browser to sign in with Microsoft".to_string(),
        auth_url,
    }))
}

/// Sign in without a goal group (current week, list views).
async fn login(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    let (_, auth_url) = start_sign_in(&state)?;

    tracing::info!(
        client_id = %state.config.ms_client_id,
        "Starting OAuth flow"
    );

    Ok(Json(AuthUrlResponse {
        message: "Open the URL in your browser to sign in with Microsoft".to_string(),
        auth_url,
    }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Result of a completed sign-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub message: String,
    /// Bearer token for the protected `/api` routes
    pub session_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals_created: Option<GoalCreationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals_error: Option<String>,
}

/// OAuth callback - exchange code, cache the token, create any parked goals.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    // Check for OAuth errors
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        tracing::warn!(error = %error, description = %description, "OAuth error from Microsoft");
        return Err(AppError::BadRequest(format!(
            "Microsoft sign-in failed: {} {}",
            error, description
        )));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;
    let raw_state = params
        .state
        .ok_or_else(|| AppError::BadRequest("Missing state parameter".to_string()))?;

    let now = state.clock.now();
    let oauth_state = verify_state(&raw_state, &state.config.session_signing_key, now)
        .ok_or_else(|| AppError::BadRequest("Invalid or expired state parameter".to_string()))?;
    let session_id = oauth_state.session_id;

    tracing::info!("Exchanging authorization code for tokens");
    let grant = state.goal_service.graph().exchange_code(&code).await?;
    state.token_cache.save_grant(&session_id, &grant).await?;

    let mut response = CallbackResponse {
        message: "Signed in with Microsoft".to_string(),
        session_token: String::new(),
        goals_created: None,
        goals_error: None,
    };

    if let Some(group) = state.pending_plans.take(&session_id, now) {
        match state
            .goal_service
            .create_goals(&grant.access_token, &group)
            .await
        {
            Ok(summary) => {
                response.message = format!(
                    "Goals from group '{}' created successfully.",
                    group.goal_group_name
                );
                response.goals_created = Some(summary);
            }
            Err(e) => {
                tracing::error!(error = %e, goal_group = %group.goal_group_name, "Failed to create goals");
                if e.is_graph_token_error() {
                    state.token_cache.clear_token(&session_id).await;
                }
                response.message = format!(
                    "Signed in, but goals from group '{}' could not be created",
                    group.goal_group_name
                );
                response.goals_error = Some(e.to_string());
            }
        }
    }

    response.session_token = create_jwt(&session_id, &state.config.session_signing_key, now)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(response))
}
