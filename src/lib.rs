//! agro-advisor
//!
//! Terminal client for the crop advisory backend: leaf photo diagnosis,
//! fertilizer recommendations from soil readings, explanations, and the
//! saved-results history. Pure logic lives in `agro-advisor-common`.

pub mod acquire;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod results;
pub mod storage;
pub mod ui;
pub mod workflow;
