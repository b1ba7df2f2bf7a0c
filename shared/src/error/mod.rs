//! Unified error handling
//!
//! Error codes, the [`AppError`] type, and HTTP status mapping live here so
//! that the server and any future clients agree on the taxonomy.

pub mod codes;
pub mod http;
pub mod types;

pub use codes::ErrorCode;
pub use types::{AppError, ErrorBody};
