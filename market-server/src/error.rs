//! Unified service-layer error type for market-server
//!
//! `ServiceError` bridges the gap between DB-layer errors (`sqlx::Error`)
//! and the API-layer error (`AppError`). It enables `?` propagation without
//! manual `.map_err(|e| { tracing::error!(...); AppError::new(...) })`
//! boilerplate in every handler.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Service-layer error — only two variants, keeps things simple.
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to DatabaseError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Database or infrastructure error
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;
