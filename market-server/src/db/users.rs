//! User table access

use shared::models::User;
use sqlx::PgExecutor;

pub async fn find_by_id(ex: impl PgExecutor<'_>, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(ex)
            .await?;
    Ok(row.map(|(id, name, email)| User { id, name, email }))
}
