// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// The session has no usable Microsoft token; the user must sign in again.
    #[error("Microsoft sign-in required")]
    ReauthenticationRequired,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Microsoft Graph API error: {0}")]
    GraphApi(String),

    #[error("No task lists found in Microsoft To Do; create goals first via /api/goals/create")]
    NoTaskLists,

    #[error("No tasks with due dates: {0}")]
    NoDueDates(String),

    #[error("Token refresh is not available")]
    RefreshUnavailable,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Graph answered 401: the access token was rejected.
    pub const GRAPH_TOKEN_ERROR: &'static str = "Graph access token rejected";
    /// Graph answered 429.
    pub const GRAPH_RATE_LIMIT: &'static str = "Graph rate limit exceeded";

    /// Whether this error means the provider no longer accepts our token.
    pub fn is_graph_token_error(&self) -> bool {
        match self {
            AppError::GraphApi(msg) => {
                msg == Self::GRAPH_TOKEN_ERROR || msg.contains("InvalidAuthenticationToken")
            }
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::ReauthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                "reauthentication_required",
                Some("Please sign in with Microsoft again".to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::GraphApi(msg) => (StatusCode::BAD_GATEWAY, "graph_error", Some(msg.clone())),
            AppError::NoTaskLists => (
                StatusCode::NOT_FOUND,
                "no_task_lists",
                Some(self.to_string()),
            ),
            AppError::NoDueDates(msg) => {
                (StatusCode::NOT_FOUND, "no_due_dates", Some(msg.clone()))
            }
            AppError::RefreshUnavailable => (
                StatusCode::UNAUTHORIZED,
                "reauthentication_required",
                None,
            ),
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
