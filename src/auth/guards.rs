//! Request guards resolving a bearer credential to an account.
//!
//! Two guards share one verification routine and differ only in failure
//! discipline: [`AuthUser`] (Authorization header) fails the request with
//! 401 for API clients, while [`OptionalAuthUser`] (session cookie) never
//! fails and yields `None` so browser flows can redirect instead.

use rocket::Request;
use rocket::State;
use rocket::request::{FromRequest, Outcome};
use rocket_db_pools::sqlx::{self, PgPool};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::{AuthError, AuthResult, AuthState};
use crate::models::User;
use crate::request_logger::RequestIdentity;

const SESSION_COOKIE_SCHEME: &str = "Bearer ";

/// A verified bearer identity for API endpoints.
#[derive(Debug, OpenApiFromRequest)]
pub struct AuthUser(pub User);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match user_from_header(request).await {
            Ok(user) => {
                request.local_cache(|| RequestIdentity(Some(user.email.clone())));
                Outcome::Success(AuthUser(user))
            }
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// A maybe-present identity for browser session flows. Missing cookie, bad
/// prefix, invalid signature, expiry, and unknown subject all collapse to
/// `None`; the guard itself never rejects the request.
#[derive(Debug, OpenApiFromRequest)]
pub struct OptionalAuthUser(pub Option<User>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for OptionalAuthUser {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let user = user_from_cookie(request).await.ok();
        if let Some(user) = &user {
            request.local_cache(|| RequestIdentity(Some(user.email.clone())));
        }
        Outcome::Success(OptionalAuthUser(user))
    }
}

async fn user_from_header(request: &Request<'_>) -> AuthResult<User> {
    let token = bearer_token_from_request(request)?;
    resolve_token_user(request, token).await
}

async fn user_from_cookie(request: &Request<'_>) -> AuthResult<User> {
    let auth_state = auth_state(request).await?;

    let cookie = request
        .cookies()
        .get(&auth_state.config.session_cookie_name)
        .ok_or(AuthError::Unauthorized)?;
    let token = cookie
        .value()
        .strip_prefix(SESSION_COOKIE_SCHEME)
        .ok_or(AuthError::TokenInvalid)?;
    if token.is_empty() {
        return Err(AuthError::TokenInvalid);
    }

    resolve_token_user(request, token).await
}

/// Shared verification core: decode the token, then resolve its subject
/// claim to a stored account. A subject that no longer resolves is as
/// unauthenticated as a bad signature.
async fn resolve_token_user(request: &Request<'_>, token: &str) -> AuthResult<User> {
    let auth_state = auth_state(request).await?;

    let pool = request
        .guard::<&State<PgPool>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("database pool missing from state".into()))?;

    let claims = auth_state.jwt_service.decode_access_token(token)?;

    let user: Option<User> = sqlx::query_as(
        r#"SELECT id, email, phone_number, password_hash, first_name, last_name,
                  show_phone_number, created_at
           FROM users WHERE email = $1"#,
    )
    .bind(&claims.sub)
    .fetch_optional(pool.inner())
    .await?;

    user.ok_or(AuthError::Unauthorized)
}

async fn auth_state<'r>(request: &'r Request<'_>) -> AuthResult<&'r AuthState> {
    request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .map(|state| state.inner())
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))
}

fn bearer_token_from_request<'r>(request: &'r Request<'_>) -> AuthResult<&'r str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}
