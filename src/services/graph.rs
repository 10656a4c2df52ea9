// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft identity platform and Graph To Do client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization code exchange
//! - Task list and task creation
//! - Reading lists and tasks back

use crate::config::{Config, OAUTH_SCOPES};
use crate::error::AppError;
use crate::models::{TaskList, TodoTask, TokenGrant};
use crate::time_utils::{format_graph_date, parse_graph_datetime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Graph To Do client.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    login_base_url: String,
    graph_base_url: String,
    tenant: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl GraphClient {
    /// Create a client from application configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            login_base_url: config.login_base_url.trim_end_matches('/').to_string(),
            graph_base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            tenant: config.ms_tenant.clone(),
            client_id: config.ms_client_id.clone(),
            client_secret: config.ms_client_secret.clone(),
            redirect_uri: config.redirect_uri(),
        })
    }

    /// Build the URL the user visits to sign in.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             response_mode=query&\
             scope={}&\
             state={}",
            self.login_base_url,
            self.tenant,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.login_base_url, self.tenant);

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("scope", OAUTH_SCOPES),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::GraphApi(format!("Token exchange failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Microsoft token exchange failed");
            return Err(AppError::GraphApi(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GraphApi(format!("Failed to parse token response: {}", e)))
    }

    /// Create a To Do list, returning its ID.
    pub async fn create_task_list(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> Result<String, AppError> {
        let url = format!("{}/me/todo/lists", self.graph_base_url);
        let body = serde_json::json!({ "displayName": display_name });

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GraphApi(e.to_string()))?;

        let created: GraphTaskList = self.check_response_json(response).await?;
        Ok(created.id)
    }

    /// Create a task due on `due_date` (UTC midnight) in a list.
    pub async fn create_task(
        &self,
        access_token: &str,
        list_id: &str,
        title: &str,
        due_date: NaiveDate,
    ) -> Result<(), AppError> {
        let url = format!(
            "{}/me/todo/lists/{}/tasks",
            self.graph_base_url,
            urlencoding::encode(list_id)
        );
        let body = NewTask {
            title,
            due_date_time: GraphDateTime {
                date_time: format_graph_date(due_date),
                time_zone: "UTC".to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GraphApi(e.to_string()))?;

        self.check_response(response).await
    }

    /// All of the user's To Do lists, following pagination.
    pub async fn list_task_lists(&self, access_token: &str) -> Result<Vec<TaskList>, AppError> {
        let url = format!("{}/me/todo/lists", self.graph_base_url);
        let lists: Vec<GraphTaskList> = self.get_paged(url, access_token).await?;

        Ok(lists
            .into_iter()
            .map(|l| TaskList {
                id: l.id,
                display_name: l.display_name,
            })
            .collect())
    }

    /// All tasks in one list, following pagination.
    pub async fn list_tasks(
        &self,
        access_token: &str,
        list_id: &str,
    ) -> Result<Vec<TodoTask>, AppError> {
        let url = format!(
            "{}/me/todo/lists/{}/tasks",
            self.graph_base_url,
            urlencoding::encode(list_id)
        );
        let tasks: Vec<GraphTask> = self.get_paged(url, access_token).await?;

        Ok(tasks.into_iter().map(GraphTask::into_todo_task).collect())
    }

    /// GET a collection, following `@odata.nextLink` until exhausted.
    async fn get_paged<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        access_token: &str,
    ) -> Result<Vec<T>, AppError> {
        let mut items = Vec::new();
        let mut next = Some(url);

        while let Some(url) = next {
            let response = self
                .http
                .get(&url)
                .bearer_auth(access_token)
                .send()
                .await
                .map_err(|e| AppError::GraphApi(e.to_string()))?;

            let page: GraphCollection<T> = self.check_response_json(response).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_for(response).await)
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| AppError::GraphApi(format!("JSON parse error: {}", e)))
    }

    async fn error_for(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Graph rate limit hit (429)");
            return AppError::GraphApi(AppError::GRAPH_RATE_LIMIT.to_string());
        }

        // Unauthorized - token expired or revoked on Microsoft's side
        if status.as_u16() == 401 {
            return AppError::GraphApi(AppError::GRAPH_TOKEN_ERROR.to_string());
        }

        AppError::GraphApi(format!("HTTP {}: {}", status, body))
    }
}

/// OData collection envelope.
#[derive(Debug, Deserialize)]
struct GraphCollection<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphTaskList {
    id: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphTask {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    due_date_time: Option<GraphDateTime>,
}

fn default_status() -> String {
    "notStarted".to_string()
}

impl GraphTask {
    fn into_todo_task(self) -> TodoTask {
        let due_date_time = self.due_date_time.and_then(|d| {
            let parsed = parse_graph_datetime(&d.date_time);
            if parsed.is_none() {
                tracing::warn!(task_id = %self.id, value = %d.date_time, "Unparsable task due date");
            }
            parsed
        });

        TodoTask {
            id: self.id,
            title: self.title,
            status: self.status,
            due_date_time,
        }
    }
}

/// Graph `dateTimeTimeZone` resource.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTask<'a> {
    title: &'a str,
    due_date_time: GraphDateTime,
}
