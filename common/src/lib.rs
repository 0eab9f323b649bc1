use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A blog post as stored in (and returned from) the database.
#[derive(FromRow, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PostDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Request body shared by the register and login endpoints.
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct Credentials {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for creating or updating a post.
///
/// Only the create path runs validation; updates accept whatever the
/// client sends, matching the lenient update contract.
#[derive(Serialize, Deserialize, Validate, Clone, Debug)]
pub struct PostPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
}

/// The identity attached to an active session. Never carries the
/// password hash.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

/// Response of `GET /api/check-login`.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatus {
    pub logged_in: bool,
    pub user: Option<SessionUser>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OkResponse {
    pub success: bool,
}

/// Response of `POST /api/posts`: the freshly assigned row id.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: i64,
}
