//! User model (boundary collaborator — CRUD lives outside this core)

use serde::{Deserialize, Serialize};

/// User entity, read-only inside the order/payment core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}
