//! User data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staff member. The password credential lives in its own table and is
/// never part of this struct, so serializing a user can't leak it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
}
