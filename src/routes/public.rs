use rocket_db_pools::{Connection, sqlx};
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::CarQrDb;
use crate::error::ApiError;
use crate::models::PublicCarInfo;

/// Anonymous lookup of a car's public info by license plate, the endpoint a
/// windshield QR code points at.
///
/// Exposes brand and model, plus the owner's phone number when they opted
/// into sharing it. Nothing else leaves this endpoint.
#[openapi(tag = "Public")]
#[get("/public/cars/<license_plate>")]
pub async fn find_car_by_plate(
    license_plate: &str,
    mut db: Connection<CarQrDb>,
) -> Result<Json<PublicCarInfo>, ApiError> {
    let row: Option<(String, String, String, bool)> = sqlx::query_as(
        r#"SELECT c.brand, c.model, u.phone_number, u.show_phone_number
           FROM cars c
           JOIN users u ON u.id = c.owner_id
           WHERE c.license_plate = $1"#,
    )
    .bind(license_plate)
    .fetch_optional(db.as_mut())
    .await?;

    let (brand, model, phone_number, show_phone_number) = row.ok_or_else(|| {
        ApiError::NotFound(format!("Car with plate {license_plate} not found"))
    })?;

    Ok(Json(PublicCarInfo {
        brand,
        model,
        owner_phone: show_phone_number.then_some(phone_number),
    }))
}
