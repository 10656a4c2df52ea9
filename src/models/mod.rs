// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod goal;
pub mod todo;
pub mod token;

pub use goal::{Goal, GoalGroup};
pub use todo::{TaskList, TodoTask};
pub use token::{CachedToken, TokenGrant};
