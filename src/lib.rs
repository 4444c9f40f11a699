//! Bookkeep Library Lending Server
//!
//! Book inventory, categories with borrowing limits, and a loan/sale
//! lifecycle with billing and overdue penalties, served as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, LendingRejection};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
