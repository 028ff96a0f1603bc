//! # Tide Common Library
//!
//! Shared code for the Tide audit microservices including:
//! - Database schema, models and queries
//! - API client authentication
//! - Audit standards catalog
//! - Configuration loading
//! - Common error types

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod standards;

pub use error::{Error, LookupError, Result};
