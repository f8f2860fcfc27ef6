//! Middleware module for the Amora HTTP server
//!
//! Provides:
//! - Authentication middleware (Bearer token / query token)

pub mod auth;

pub use auth::{AuthedUser, BearerToken};
