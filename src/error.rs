use rocket::http::{Header, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response, catch};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

use crate::auth::AuthError;

#[derive(Debug)]
pub enum ApiError {
    DatabaseError(sqlx::Error),
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Conflict { field: &'static str, message: String },
    Validation(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::DatabaseError(e) => {
                log::error!("database error: {}", e);
                (Status::InternalServerError, "DatabaseError", e.to_string())
            }
            ApiError::Unauthenticated(msg) => {
                log::debug!("unauthenticated: {}", msg);
                (Status::Unauthorized, "Unauthenticated", msg)
            }
            ApiError::Forbidden(msg) => {
                log::debug!("forbidden: {}", msg);
                (Status::Forbidden, "Forbidden", msg)
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::Conflict { field, message } => {
                log::debug!("conflict on {}: {}", field, message);
                (Status::Conflict, "Conflict", message)
            }
            ApiError::Validation(msg) => {
                log::debug!("validation error: {}", msg);
                (Status::UnprocessableEntity, "ValidationError", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        let mut builder = Response::build();
        builder
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json));

        if status == Status::Unauthorized {
            builder.header(Header::new("WWW-Authenticate", "Bearer"));
        }

        builder.ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        Ok(Responses::default())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                // Unique violation: name the colliding field from the
                // constraint so a racing create still reports 409, not 500.
                let field = match db_err.constraint() {
                    Some("users_email_key") => "email",
                    Some("users_phone_number_key") => "phone_number",
                    Some("cars_license_plate_key") => "license_plate",
                    _ => "unique field",
                };
                ApiError::Conflict {
                    field,
                    message: format!("Value for {field} is already taken"),
                }
            }
            _ => ApiError::DatabaseError(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid
            | AuthError::Unauthorized => ApiError::Unauthenticated(err.to_string()),
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            AuthError::Sqlx(e) => ApiError::from(e),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Catcher for 401s raised by request guards, so a rejected bearer
/// credential still produces the JSON error body and the
/// `WWW-Authenticate: Bearer` hint.
#[catch(401)]
pub fn unauthorized() -> ApiError {
    ApiError::Unauthenticated("Could not validate credentials".to_string())
}
