use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Account Models =====

/// Account row as stored. Deliberately not serializable: responses go
/// through [`UserRead`] so the password hash can never reach the wire.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub show_phone_number: bool,
    pub created_at: DateTime<Utc>,
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserRead {
    pub id: i32,
    pub email: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub show_phone_number: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone_number: user.phone_number,
            first_name: user.first_name,
            last_name: user.last_name,
            show_phone_number: user.show_phone_number,
            created_at: user.created_at,
        }
    }
}

// ===== Vehicle Models =====

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Car {
    pub id: i32,
    pub license_plate: String,
    pub brand: String,
    pub model: String,
    pub owner_id: i32,
}

/// Payload for anonymous plate lookups. Excludes the car id, the owner
/// reference, and the plate itself; the phone number appears only when the
/// owner opted into sharing it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PublicCarInfo {
    pub brand: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_phone: Option<String>,
}

// ===== Response Envelopes =====

/// Generic wrapper for list responses.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}
