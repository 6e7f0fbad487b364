#[rocket::launch]
fn rocket() -> rocket::Rocket<rocket::Build> {
    let server = carqr_api::rocket();
    log::info!("Starting Car QR API server");
    server
}
