//! # API Shared
//!
//! Shared wire types for the Panda APIs.
//!
//! Contains:
//! - Request and response DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest`; kept free of domain logic so any future transport can reuse it.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
