//! HTTP API handlers

pub mod audit;
pub mod auth;
pub mod health;
pub mod users;
