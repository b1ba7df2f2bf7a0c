//! Data models
//!
//! Shared between market-server and frontend (via API).
//! All IDs are `i64` (snowflake-style, see [`crate::util::snowflake_id`]).
//! Money fields are `rust_decimal::Decimal`, never floats.

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

// Re-exports
pub use cart::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use user::*;
