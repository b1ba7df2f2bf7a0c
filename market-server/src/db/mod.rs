//! Database access layer
//!
//! Free async functions per table over `sqlx` executors, so the same
//! function works against the pool or inside a transaction. All mutations
//! with concurrency implications are conditional UPDATEs checked via
//! `rows_affected` — the database is the arbiter, not application state.

pub mod cart;
pub mod orders;
pub mod outbox;
pub mod payments;
pub mod products;
pub mod users;

/// Whether a sqlx error is a unique-constraint violation on the given
/// constraint (Postgres error code 23505).
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

/// Whether a sqlx error is a foreign-key violation (Postgres 23503),
/// e.g. deleting an order that payment rows still reference.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503"))
}
