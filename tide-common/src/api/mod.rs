//! API primitives shared by the service binaries

pub mod auth;
