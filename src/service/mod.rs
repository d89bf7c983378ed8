//! Service layer for the commander-ladder service
//!
//! This module contains the ladder operations facade, the application state
//! and background task management.

pub mod app;
pub mod ladder;

pub use app::{AppState, ServiceError};
pub use ladder::{Dataset, ImportSummary, LadderService, Repositories};
