// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal orchestration on top of the Graph client.
//!
//! Turns a goal group into To Do lists with one weekly task each, and
//! derives the program's current week from the due dates found in To Do.

use crate::error::AppError;
use crate::models::{GoalGroup, TaskList, TodoTask};
use crate::services::graph::GraphClient;
use crate::services::week::{compute_week, WeekProgress};
use chrono::{Datelike, Duration, NaiveDate};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};

/// Lists fetched concurrently when reading tasks back.
const MAX_CONCURRENT_LIST_FETCHES: usize = 4;

/// Outcome of creating a goal group in To Do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalCreationSummary {
    pub lists_created: u32,
    pub tasks_created: u32,
    pub tasks_failed: u32,
}

/// Per-list counts reported alongside the current week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSummary {
    pub list_name: String,
    pub total_tasks: usize,
    pub tasks_with_due_dates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Current week derived from the earliest task due date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeekReport {
    #[serde(flatten)]
    pub progress: WeekProgress,
    pub earliest_due_date: NaiveDate,
    pub latest_due_date: NaiveDate,
    pub total_lists: usize,
    pub total_tasks: usize,
    pub lists: Vec<ListSummary>,
}

/// A list together with its tasks, or the error that kept them from loading.
#[derive(Debug, Clone, Serialize)]
pub struct ListWithTasks {
    #[serde(flatten)]
    pub list: TaskList,
    pub tasks: Vec<TodoTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A list and the result of fetching its tasks.
pub type FetchedList = (TaskList, Result<Vec<TodoTask>, AppError>);

/// Due dates for `count` weekly tasks: week `i` starts `7 * i` days after
/// `start`, and the task is due on the first Sunday on or after that day.
pub fn weekly_due_dates(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| {
            let week_start = start + Duration::days(7 * i as i64);
            let to_sunday = (7 - week_start.weekday().num_days_from_sunday()) % 7;
            week_start + Duration::days(i64::from(to_sunday))
        })
        .collect()
}

/// Derive the current week from fetched lists.
///
/// Tasks without a due date are counted but ignored for the start date.
/// Lists whose fetch failed are reported with their error.
pub fn current_week_from_lists(
    fetched: Vec<FetchedList>,
    today: NaiveDate,
) -> Result<CurrentWeekReport, AppError> {
    if fetched.is_empty() {
        return Err(AppError::NoTaskLists);
    }

    let total_lists = fetched.len();
    let mut summaries = Vec::with_capacity(total_lists);
    let mut due_dates = Vec::new();
    let mut total_tasks = 0;

    for (list, result) in fetched {
        match result {
            Ok(tasks) => {
                let dated: Vec<NaiveDate> = tasks
                    .iter()
                    .filter_map(|t| t.due_date_time.map(|d| d.date()))
                    .collect();
                total_tasks += tasks.len();
                summaries.push(ListSummary {
                    list_name: list.display_name,
                    total_tasks: tasks.len(),
                    tasks_with_due_dates: dated.len(),
                    error: None,
                });
                due_dates.extend(dated);
            }
            Err(e) => summaries.push(ListSummary {
                list_name: list.display_name,
                total_tasks: 0,
                tasks_with_due_dates: 0,
                error: Some(e.to_string()),
            }),
        }
    }

    let (Some(earliest), Some(latest)) = (
        due_dates.iter().min().copied(),
        due_dates.iter().max().copied(),
    ) else {
        let details: Vec<String> = summaries.iter().map(describe_list).collect();
        return Err(AppError::NoDueDates(format!(
            "found {} list(s) with {} task(s) in total, none with a due date [{}]",
            total_lists,
            total_tasks,
            details.join("; ")
        )));
    };

    Ok(CurrentWeekReport {
        progress: compute_week(earliest, today),
        earliest_due_date: earliest,
        latest_due_date: latest,
        total_lists,
        total_tasks,
        lists: summaries,
    })
}

fn describe_list(summary: &ListSummary) -> String {
    match &summary.error {
        Some(e) => format!("'{}': error - {}", summary.list_name, e),
        None => format!(
            "'{}': {} task(s), {} with due dates",
            summary.list_name, summary.total_tasks, summary.tasks_with_due_dates
        ),
    }
}

/// Goal operations against a user's To Do account.
#[derive(Clone)]
pub struct GoalService {
    graph: GraphClient,
}

impl GoalService {
    pub fn new(graph: GraphClient) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &GraphClient {
        &self.graph
    }

    /// Create one list per goal and one dated task per weekly entry.
    ///
    /// A failed list creation aborts; a failed task is counted and skipped
    /// unless Graph rejected the token.
    pub async fn create_goals(
        &self,
        access_token: &str,
        group: &GoalGroup,
    ) -> Result<GoalCreationSummary, AppError> {
        let mut summary = GoalCreationSummary::default();

        for goal in &group.goals {
            let list_id = self.graph.create_task_list(access_token, &goal.name).await?;
            summary.lists_created += 1;

            let due_dates = weekly_due_dates(group.start_date, goal.tasks.len());
            for (title, due_date) in goal.tasks.iter().zip(due_dates) {
                match self
                    .graph
                    .create_task(access_token, &list_id, title, due_date)
                    .await
                {
                    Ok(()) => summary.tasks_created += 1,
                    Err(e) if e.is_graph_token_error() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            goal = %goal.name,
                            task = %title,
                            "Failed to create task, continuing"
                        );
                        summary.tasks_failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            goal_group = %group.goal_group_name,
            lists_created = summary.lists_created,
            tasks_created = summary.tasks_created,
            tasks_failed = summary.tasks_failed,
            "Goal group created in To Do"
        );

        Ok(summary)
    }

    /// Fetch every list and its tasks. Per-list failures are kept in the result.
    pub async fn fetch_lists(&self, access_token: &str) -> Result<Vec<FetchedList>, AppError> {
        let lists = self.graph.list_task_lists(access_token).await?;

        let fetched: Vec<FetchedList> = stream::iter(lists)
            .map(|list| async move {
                let tasks = self.graph.list_tasks(access_token, &list.id).await;
                (list, tasks)
            })
            .buffered(MAX_CONCURRENT_LIST_FETCHES)
            .collect()
            .await;

        // A rejected token is not a per-list problem
        if fetched
            .iter()
            .any(|(_, r)| matches!(r, Err(e) if e.is_graph_token_error()))
        {
            return Err(AppError::GraphApi(AppError::GRAPH_TOKEN_ERROR.to_string()));
        }

        Ok(fetched)
    }

    /// Current week derived from the user's task due dates.
    pub async fn current_week(
        &self,
        access_token: &str,
        today: NaiveDate,
    ) -> Result<CurrentWeekReport, AppError> {
        let fetched = self.fetch_lists(access_token).await?;
        current_week_from_lists(fetched, today)
    }

    /// Every list with its tasks. A list whose tasks cannot be read is kept
    /// with its error and no tasks.
    pub async fn lists_with_tasks(
        &self,
        access_token: &str,
    ) -> Result<Vec<ListWithTasks>, AppError> {
        let lists = self
            .fetch_lists(access_token)
            .await?
            .into_iter()
            .map(|(list, tasks)| match tasks {
                Ok(tasks) => ListWithTasks {
                    list,
                    tasks,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, list = %list.display_name, "Failed to read list tasks");
                    ListWithTasks {
                        list,
                        tasks: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();
        Ok(lists)
    }
}
