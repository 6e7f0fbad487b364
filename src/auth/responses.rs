use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::models::UserRead;

/// Credential form accepted by both login endpoints. Field names follow the
/// OAuth2 password grant: the account email travels as `username`.
#[derive(Debug, FromForm, JsonSchema)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionResponse {
    pub session_expires_at: DateTime<Utc>,
}

/// Session introspection payload. `user` is present exactly when
/// `authenticated` is true.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRead>,
}
