//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (accounts, cars,
//! the anonymous public lookup) and exposes typed Rocket handlers annotated
//! with `#[openapi]` so `rocket_okapi` can derive an OpenAPI document
//! automatically.

pub mod cars;
pub mod health;
pub mod public;
pub mod users;
