use rocket::response::status;
use rocket::serde::json::Json;
use rocket_db_pools::{Connection, sqlx};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::Deserialize;

use crate::auth::guards::AuthUser;
use crate::db::CarQrDb;
use crate::error::ApiError;
use crate::models::{Car, DataResponse};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CarCreate {
    pub license_plate: String,
    pub brand: String,
    pub model: String,
}

/// Partial update: absent fields keep their current value. The owner
/// reference is not updatable.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CarUpdate {
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Attach a new car to the authenticated account.
#[openapi(tag = "Cars")]
#[post("/cars", data = "<body>")]
pub async fn create_car(
    user: AuthUser,
    body: Json<CarCreate>,
    mut db: Connection<CarQrDb>,
) -> Result<status::Created<Json<Car>>, ApiError> {
    validate_car_fields(&body.license_plate, &body.brand, &body.model)?;

    let car: Car = sqlx::query_as(
        r#"INSERT INTO cars (license_plate, brand, model, owner_id)
           VALUES ($1, $2, $3, $4)
           RETURNING id, license_plate, brand, model, owner_id"#,
    )
    .bind(&body.license_plate)
    .bind(&body.brand)
    .bind(&body.model)
    .bind(user.0.id)
    .fetch_one(db.as_mut())
    .await?;

    log::info!("user {} registered car {} ({})", user.0.id, car.id, car.license_plate);

    let location = format!("/cars/{}", car.id);
    Ok(status::Created::new(location).body(Json(car)))
}

/// List the authenticated account's cars.
#[openapi(tag = "Cars")]
#[get("/cars")]
pub async fn list_cars(
    user: AuthUser,
    mut db: Connection<CarQrDb>,
) -> Result<Json<DataResponse<Vec<Car>>>, ApiError> {
    let cars: Vec<Car> = sqlx::query_as(
        r#"SELECT id, license_plate, brand, model, owner_id
           FROM cars
           WHERE owner_id = $1
           ORDER BY id ASC"#,
    )
    .bind(user.0.id)
    .fetch_all(db.as_mut())
    .await?;

    Ok(Json(DataResponse { data: cars }))
}

/// Update a car's plate, brand, or model. Owner only.
#[openapi(tag = "Cars")]
#[patch("/cars/<id>", data = "<body>")]
pub async fn update_car(
    user: AuthUser,
    id: i32,
    body: Json<CarUpdate>,
    mut db: Connection<CarQrDb>,
) -> Result<Json<Car>, ApiError> {
    let car = fetch_owned_car(&mut db, id, user.0.id).await?;

    let license_plate = body.license_plate.clone().unwrap_or(car.license_plate);
    let brand = body.brand.clone().unwrap_or(car.brand);
    let model = body.model.clone().unwrap_or(car.model);
    validate_car_fields(&license_plate, &brand, &model)?;

    let updated: Car = sqlx::query_as(
        r#"UPDATE cars
           SET license_plate = $1, brand = $2, model = $3
           WHERE id = $4
           RETURNING id, license_plate, brand, model, owner_id"#,
    )
    .bind(&license_plate)
    .bind(&brand)
    .bind(&model)
    .bind(id)
    .fetch_one(db.as_mut())
    .await?;

    Ok(Json(updated))
}

/// Remove a car from the account. Owner only.
#[openapi(tag = "Cars")]
#[delete("/cars/<id>")]
pub async fn delete_car(
    user: AuthUser,
    id: i32,
    mut db: Connection<CarQrDb>,
) -> Result<status::NoContent, ApiError> {
    fetch_owned_car(&mut db, id, user.0.id).await?;

    sqlx::query("DELETE FROM cars WHERE id = $1")
        .bind(id)
        .execute(db.as_mut())
        .await?;

    log::info!("user {} deleted car {}", user.0.id, id);

    Ok(status::NoContent)
}

/// Fetch a car and require the requester to own it.
///
/// A missing car is 404; a present but foreign car is 403. Runs before any
/// mutation is applied.
async fn fetch_owned_car(
    db: &mut Connection<CarQrDb>,
    car_id: i32,
    owner_id: i32,
) -> Result<Car, ApiError> {
    let car: Option<Car> = sqlx::query_as(
        "SELECT id, license_plate, brand, model, owner_id FROM cars WHERE id = $1",
    )
    .bind(car_id)
    .fetch_optional(db.as_mut())
    .await?;

    let car = car.ok_or_else(|| ApiError::NotFound(format!("Car {car_id} not found")))?;
    if car.owner_id != owner_id {
        return Err(ApiError::Forbidden(
            "Car belongs to another user".to_string(),
        ));
    }

    Ok(car)
}

fn validate_car_fields(license_plate: &str, brand: &str, model: &str) -> Result<(), ApiError> {
    if license_plate.trim().is_empty() {
        return Err(ApiError::Validation("license_plate must not be empty".into()));
    }
    if brand.trim().is_empty() {
        return Err(ApiError::Validation("brand must not be empty".into()));
    }
    if model.trim().is_empty() {
        return Err(ApiError::Validation("model must not be empty".into()));
    }
    Ok(())
}
