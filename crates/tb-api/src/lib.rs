//! # tb-api
//!
//! JSON HTTP API for Taskboard, served under `/api/v1`.
//!
//! Handlers stay thin: they extract the caller and the request, call one
//! service operation and wrap the result in a representer. Errors from the
//! services become [`error::ApiError`] responses.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod representers;
pub mod routes;

pub use extractors::{AppState, RateLimits};
pub use routes::{router, API_PREFIX};
