use rocket::State;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::auth::AuthState;
use crate::auth::guards::AuthUser;
use crate::db::CarQrDb;
use crate::error::ApiError;
use crate::models::{User, UserRead};

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 32;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub phone_number: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub show_phone_number: bool,
}

/// Register a new account. The password is hashed before storage and never
/// appears in the response.
#[openapi(tag = "Users")]
#[post("/users", data = "<body>")]
pub async fn register(
    body: Json<RegisterRequest>,
    state: &State<AuthState>,
    mut db: Connection<CarQrDb>,
) -> Result<status::Created<Json<UserRead>>, ApiError> {
    validate_registration(&body)?;

    // Friendly pre-checks naming the colliding field. The unique
    // constraints still decide any concurrent race; see the 23505
    // translation in `ApiError`.
    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&body.email)
            .fetch_one(db.as_mut())
            .await?;
    if email_taken {
        return Err(ApiError::Conflict {
            field: "email",
            message: format!("User with email {} already exists", body.email),
        });
    }

    let phone_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone_number = $1)")
            .bind(&body.phone_number)
            .fetch_one(db.as_mut())
            .await?;
    if phone_taken {
        return Err(ApiError::Conflict {
            field: "phone_number",
            message: format!("User with phone number {} already exists", body.phone_number),
        });
    }

    let password_hash = state.password_service.hash_password(&body.password)?;

    let user: User = sqlx::query_as(
        r#"INSERT INTO users (email, phone_number, password_hash, first_name, last_name, show_phone_number)
           VALUES ($1, $2, $3, $4, $5, $6)
           RETURNING id, email, phone_number, password_hash, first_name, last_name,
                     show_phone_number, created_at"#,
    )
    .bind(&body.email)
    .bind(&body.phone_number)
    .bind(&password_hash)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(body.show_phone_number)
    .fetch_one(db.as_mut())
    .await?;

    log::info!("registered user {} ({})", user.id, user.email);

    let location = format!("/users/{}", user.id);
    Ok(status::Created::new(location).body(Json(UserRead::from(user))))
}

/// Return the authenticated account's own profile.
#[openapi(tag = "Users")]
#[get("/users/me")]
pub async fn me(user: AuthUser) -> Json<UserRead> {
    Json(UserRead::from(user.0))
}

fn validate_registration(body: &RegisterRequest) -> Result<(), ApiError> {
    let password_len = body.password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password_len) {
        return Err(ApiError::Validation(format!(
            "password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
        )));
    }
    if !body.email.contains('@') {
        return Err(ApiError::Validation("email is not a valid address".into()));
    }
    if body.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("phone_number must not be empty".into()));
    }
    Ok(())
}
