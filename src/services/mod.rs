// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod goals;
pub mod graph;
pub mod oauth_state;
pub mod token_cache;
pub mod week;

pub use goals::{CurrentWeekReport, GoalCreationSummary, GoalService};
pub use graph::GraphClient;
pub use oauth_state::PendingPlans;
pub use token_cache::{RefreshUnsupported, TokenCache, TokenRefresher};
pub use week::{compute_week, WeekProgress, PROGRAM_WEEKS};
