use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,                // mirrors email for OAuth accounts
    pub email: String,
    pub google_oauth_id: Option<String>, // provider `sub`, only for OAuth accounts
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>, // never written by this service
}

/// Fields for a user created on first OAuth login.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub google_oauth_id: Option<String>,
}

impl NewUser {
    pub fn from_oauth(email: &str, subject: Option<&str>) -> Self {
        Self {
            username: email.to_string(),
            email: email.to_string(),
            google_oauth_id: subject.map(str::to_string),
        }
    }
}

/// One tracked symbol. This is also the wire shape returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct WatchlistEntry {
    pub id: i64,
    pub user_id: i64,
    pub symbol: String,
    pub list_name: String,
}
