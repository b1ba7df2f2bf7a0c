//! Shared types for the marketplace stack
//!
//! Common types used across server crates: domain models, status enums,
//! error types, request/response structures, and utility helpers.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, ErrorCode};
pub use models::{OrderStatus, PaymentMethod, PaymentStatus};
