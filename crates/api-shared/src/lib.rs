//! # API Shared
//!
//! Shared utilities and definitions for Koderstore APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`types` module)
//! - Shared services like `HealthService`
//! - Session-cookie verification (usable by any HTTP surface)

pub mod auth;
pub mod health;
pub mod types;

pub use auth::{SessionError, SessionVerifier, SESSION_COOKIE_NAME};
pub use health::HealthService;
pub use types::*;
