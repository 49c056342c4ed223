//! Shared types and configuration for Devalaya.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - Configuration management
//! - Tracing subscriber bootstrap

pub mod config;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, BudgetPolicy, LedgerConfig};
