//! HTTP API handlers

pub mod auth;
pub mod error;
pub mod game;
pub mod health;
pub mod provider;
pub mod users;

pub use error::{ApiError, ApiResult};
pub use health::health;
