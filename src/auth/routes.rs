use chrono::Utc;
use rocket::form::Form;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::openapi;
use time::Duration as TimeDuration;

use crate::auth::guards::OptionalAuthUser;
use crate::auth::jwt::SignedAccessToken;
use crate::auth::responses::{CredentialsForm, SessionResponse, SessionStatus, TokenResponse};
use crate::auth::{AuthError, AuthResult, AuthState};
use crate::error::ApiError;
use crate::models::{User, UserRead};

/// Verify an email/password pair against the stored credentials.
///
/// Unknown email and wrong password fail with the same
/// [`AuthError::InvalidCredentials`] so responses cannot be used to probe
/// which accounts exist. Both login endpoints go through here.
pub async fn authenticate(
    state: &AuthState,
    pool: &PgPool,
    email: &str,
    password: &str,
) -> AuthResult<User> {
    let user: Option<User> = sqlx::query_as(
        r#"SELECT id, email, phone_number, password_hash, first_name, last_name,
                  show_phone_number, created_at
           FROM users WHERE email = $1"#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    let user = user.ok_or(AuthError::InvalidCredentials)?;

    let verified = state
        .password_service
        .verify_password(password, &user.password_hash)?;
    if !verified {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}

/// Exchange an email/password form for a bearer access token.
// Form bodies are not described in the generated spec; the route is still
// mounted normally.
#[openapi(skip)]
#[post("/auth/token", data = "<form>")]
pub async fn issue_token(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    form: Form<CredentialsForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = authenticate(state.inner(), pool.inner(), form.username.trim(), &form.password).await?;
    let signed = state.jwt_service.issue_access_token(&user.email)?;

    Ok(Json(TokenResponse {
        access_token: signed.token,
        token_type: "bearer".to_string(),
    }))
}

/// Log in for a browser session. Verifies the same credentials as
/// `/auth/token` but delivers the bearer token in an HTTP-only cookie
/// instead of the response body.
#[openapi(skip)]
#[post("/auth/session", data = "<form>")]
pub async fn start_session(
    state: &State<AuthState>,
    pool: &State<PgPool>,
    cookies: &CookieJar<'_>,
    form: Form<CredentialsForm>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = authenticate(state.inner(), pool.inner(), form.username.trim(), &form.password).await?;
    let signed = state.jwt_service.issue_access_token(&user.email)?;

    set_session_cookie(cookies, state.inner(), &signed);

    Ok(Json(SessionResponse {
        session_expires_at: signed.expires_at,
    }))
}

/// Report whether the current session cookie resolves to an account.
///
/// Always 200: an absent or invalid session reports `authenticated: false`
/// so page flows can redirect to login rather than surface a protocol
/// error.
#[openapi(tag = "Auth")]
#[get("/auth/session")]
pub async fn session_status(user: OptionalAuthUser) -> Json<SessionStatus> {
    match user.0 {
        Some(user) => Json(SessionStatus {
            authenticated: true,
            user: Some(UserRead::from(user)),
        }),
        None => Json(SessionStatus {
            authenticated: false,
            user: None,
        }),
    }
}

/// Drop the browser session cookie.
#[openapi(tag = "Auth")]
#[delete("/auth/session")]
pub async fn end_session(state: &State<AuthState>, cookies: &CookieJar<'_>) -> status::NoContent {
    clear_session_cookie(cookies, state.inner());
    status::NoContent
}

fn set_session_cookie(cookies: &CookieJar<'_>, state: &AuthState, token: &SignedAccessToken) {
    let max_age_secs = (token.expires_at - Utc::now()).num_seconds().max(0);
    let mut cookie = Cookie::build((
        state.config.session_cookie_name.clone(),
        format!("Bearer {}", token.token),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(state.config.cookie_secure)
    .max_age(TimeDuration::seconds(max_age_secs))
    .build();

    if let Some(domain) = &state.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookies.add(cookie);
}

fn clear_session_cookie(cookies: &CookieJar<'_>, state: &AuthState) {
    let mut cookie = Cookie::build((state.config.session_cookie_name.clone(), String::new()))
        .path("/")
        .removal()
        .build();

    if let Some(domain) = &state.config.cookie_domain {
        cookie.set_domain(domain.clone());
    }

    cookies.add(cookie);
}
