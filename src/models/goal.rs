//! Goal group submitted by the user before signing in.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// A single goal: becomes one To Do list, one task per week.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Goal {
    #[validate(length(min = 1, max = 255, message = "Goal name must be 1-255 characters"))]
    pub name: String,
    /// Weekly task titles, in week order
    #[validate(length(max = 12, message = "A goal has at most 12 weekly tasks"))]
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// A named set of goals sharing one 12-week program start date.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoalGroup {
    #[validate(length(min = 1, max = 100, message = "Goal group name must be 1-100 characters"))]
    pub goal_group_name: String,
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: NaiveDate,
    #[validate(length(min = 1, max = 12, message = "Provide between 1 and 12 goals"), nested)]
    pub goals: Vec<Goal>,
}

impl GoalGroup {
    /// Title of the first blank task, if any.
    pub fn first_blank_task(&self) -> Option<(&str, usize)> {
        self.goals.iter().find_map(|goal| {
            goal.tasks
                .iter()
                .position(|t| t.trim().is_empty())
                .map(|i| (goal.name.as_str(), i))
        })
    }

    pub fn task_count(&self) -> usize {
        self.goals.iter().map(|g| g.tasks.len()).sum()
    }
}

/// Accept `YYYY-MM-DD` as well as full timestamps; only the date is kept.
fn deserialize_start_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_start_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid startDate: {raw}")))
}

/// Parse a user-supplied program start date.
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}
