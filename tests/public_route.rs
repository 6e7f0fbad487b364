use carqr_api::test_support::{
    TestDatabase, TestFixtures, TestRocketBuilder, api_routes, auth_state_from, provision_test_db,
    test_auth_config,
};
use rocket::http::Status;
use rocket::local::asynchronous::Client;
use serde_json::Value;

async fn api_client(db: &TestDatabase) -> Client {
    TestRocketBuilder::new()
        .with_database(db.url())
        .manage_pg_pool(db.pool_clone())
        .manage_auth_state(auth_state_from(test_auth_config()))
        .mount_api_routes(api_routes())
        .async_client()
        .await
}

#[tokio::test]
async fn plate_lookup_exposes_only_brand_and_model() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    let owner_id = fixtures
        .insert_user("private@example.com", "+380992000001", "testpassword", false)
        .await
        .expect("insert user");
    fixtures
        .insert_car(owner_id, "AO1234BC", "Toyota", "Camry")
        .await
        .expect("insert car");

    let client = api_client(&test_db).await;

    let response = client.get("/public/cars/AO1234BC").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["brand"], "Toyota");
    assert_eq!(payload["model"], "Camry");
    // The owner kept their phone private, and nothing identifying leaks.
    assert!(payload.get("owner_phone").is_none());
    assert!(payload.get("id").is_none());
    assert!(payload.get("owner_id").is_none());
    assert!(payload.get("license_plate").is_none());

    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn plate_lookup_shares_phone_when_opted_in() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    let owner_id = fixtures
        .insert_user("reachable@example.com", "+380992000002", "testpassword", true)
        .await
        .expect("insert user");
    fixtures
        .insert_car(owner_id, "KA7777KA", "Tesla", "Model 3")
        .await
        .expect("insert car");

    let client = api_client(&test_db).await;

    let response = client.get("/public/cars/KA7777KA").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["brand"], "Tesla");
    assert_eq!(payload["owner_phone"], "+380992000002");

    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn unknown_plate_is_not_found() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let client = api_client(&test_db).await;

    let response = client.get("/public/cars/NO5UCH1").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    let payload: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["error"], "NotFound");

    drop(client);
    test_db.close().await;
}
