// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Twelve Weeks: 12-week goal plans on top of Microsoft To Do
//!
//! This crate provides the backend API that signs users in with Microsoft,
//! turns their goal groups into weekly To Do tasks, and reports which week
//! of the program they are in.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::TokenStore;
use error::AppError;
use services::{GoalService, GraphClient, PendingPlans, TokenCache};
use std::sync::Arc;
use time_utils::{Clock, SystemClock};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_cache: TokenCache,
    pub goal_service: GoalService,
    pub pending_plans: PendingPlans,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire up services over the given token store, using the wall clock.
    pub fn new(config: Config, store: Arc<dyn TokenStore>) -> Result<Self, AppError> {
        let graph = GraphClient::new(&config)?;
        Ok(Self {
            token_cache: TokenCache::new(store),
            goal_service: GoalService::new(graph),
            pending_plans: PendingPlans::new(),
            clock: Arc::new(SystemClock),
            config,
        })
    }
}
