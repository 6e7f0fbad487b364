use carqr_api::auth::JwtService;
use carqr_api::test_support::{
    TestDatabase, TestFixtures, TestRocketBuilder, api_routes, auth_state_from, provision_test_db,
    test_auth_config,
};
use rocket::http::{ContentType, Cookie, Header, Status};
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
async fn login_returns_a_bearer_token_that_resolves_the_user() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures
        .insert_user("driver@example.com", "+380990000001", "testpassword", false)
        .await
        .expect("insert user");

    let client = api_client(&test_db).await;

    let response = client
        .post("/auth/token")
        .header(ContentType::Form)
        .body("username=driver@example.com&password=testpassword")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let payload: Value = response.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["token_type"], "bearer");
    let token = payload["access_token"].as_str().expect("token").to_string();

    let me = client
        .get("/users/me")
        .header(Header::new("Authorization", format!("Bearer {token}")))
        .dispatch()
        .await;
    assert_eq!(me.status(), Status::Ok);
    let me_payload: Value = me.into_json().await.expect("valid JSON payload");
    assert_eq!(me_payload["email"], "driver@example.com");

    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures
        .insert_user("known@example.com", "+380990000002", "testpassword", false)
        .await
        .expect("insert user");

    let client = api_client(&test_db).await;

    let wrong_password = client
        .post("/auth/token")
        .header(ContentType::Form)
        .body("username=known@example.com&password=not-the-password")
        .dispatch()
        .await;
    let wrong_password_status = wrong_password.status();
    let wrong_password_body = wrong_password.into_string().await.expect("body");

    let unknown_email = client
        .post("/auth/token")
        .header(ContentType::Form)
        .body("username=nobody@example.com&password=whatever123")
        .dispatch()
        .await;
    let unknown_email_status = unknown_email.status();
    let unknown_email_body = unknown_email.into_string().await.expect("body");

    assert_eq!(wrong_password_status, Status::Unauthorized);
    assert_eq!(unknown_email_status, Status::Unauthorized);
    // No distinguishing signal between the two failure modes.
    assert_eq!(wrong_password_body, unknown_email_body);

    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn expired_token_is_unauthenticated() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures
        .insert_user("late@example.com", "+380990000003", "testpassword", false)
        .await
        .expect("insert user");

    let client = api_client(&test_db).await;

    // Mint a token that expired five minutes ago, signed with the same
    // secret the server verifies against.
    let mut expired_config = test_auth_config();
    expired_config.access_token_ttl_mins = -5;
    let expired = JwtService::from_config(&expired_config)
        .issue_access_token("late@example.com")
        .expect("issue token");

    let response = client
        .get("/users/me")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", expired.token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(response.headers().get_one("WWW-Authenticate"), Some("Bearer"));

    drop(response);
    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn token_for_a_deleted_subject_is_unauthenticated() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let client = api_client(&test_db).await;

    // Valid signature, but the subject never existed.
    let ghost = JwtService::from_config(&test_auth_config())
        .issue_access_token("ghost@example.com")
        .expect("issue token");

    let response = client
        .get("/users/me")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", ghost.token),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    drop(response);
    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn session_cookie_flow_logs_in_and_out() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let fixtures = TestFixtures::new(test_db.pool());
    fixtures
        .insert_user("browser@example.com", "+380990000004", "testpassword", false)
        .await
        .expect("insert user");

    let client = api_client(&test_db).await;

    // Anonymous introspection first: soft absence, not an error.
    let anonymous = client.get("/auth/session").dispatch().await;
    assert_eq!(anonymous.status(), Status::Ok);
    let payload: Value = anonymous.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["authenticated"], false);

    let login = client
        .post("/auth/session")
        .header(ContentType::Form)
        .body("username=browser@example.com&password=testpassword")
        .dispatch()
        .await;
    assert_eq!(login.status(), Status::Ok);

    // The tracked client carries the session cookie forward.
    let introspect = client.get("/auth/session").dispatch().await;
    assert_eq!(introspect.status(), Status::Ok);
    let payload: Value = introspect.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["authenticated"], true);
    assert_eq!(payload["user"]["email"], "browser@example.com");

    let logout = client.delete("/auth/session").dispatch().await;
    assert_eq!(logout.status(), Status::NoContent);

    let after_logout = client.get("/auth/session").dispatch().await;
    let payload: Value = after_logout.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["authenticated"], false);

    drop(login);
    drop(logout);
    drop(client);
    test_db.close().await;
}

#[tokio::test]
async fn garbage_session_cookie_is_soft_absent() {
    let Some(test_db) = provision_test_db().await else {
        return;
    };
    let client = api_client(&test_db).await;

    // Wrong prefix.
    let bad_prefix = client
        .get("/auth/session")
        .cookie(Cookie::new("carqr_session", "Token abcdef"))
        .dispatch()
        .await;
    assert_eq!(bad_prefix.status(), Status::Ok);
    let payload: Value = bad_prefix.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["authenticated"], false);

    // Bearer prefix but not a token.
    let bad_token = client
        .get("/auth/session")
        .cookie(Cookie::new("carqr_session", "Bearer not-a-jwt"))
        .dispatch()
        .await;
    assert_eq!(bad_token.status(), Status::Ok);
    let payload: Value = bad_token.into_json().await.expect("valid JSON payload");
    assert_eq!(payload["authenticated"], false);

    drop(client);
    test_db.close().await;
}
