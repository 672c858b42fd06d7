//! Integration tests for the user endpoints.
//!
//! These exercise the full HTTP surface against a real Postgres instance
//! (DATABASE_URL, with schema.sql applied) and are ignored by default.
//! Run them with `cargo test -- --ignored`.

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use dotenv::dotenv;
use serde_json::{json, Value};
use sqlx::PgPool;

use tasknest::auth::TokenSigner;
use tasknest::mailer::Mailer;
use tasknest::routes;

macro_rules! test_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(TokenSigner::new("integration-test-secret")))
                .app_data(web::Data::new(Mailer::new(
                    "SG.test-key".to_string(),
                    "noreply@example.com".to_string(),
                )))
                .wrap(Logger::default())
                .service(routes::health::health)
                .configure(routes::config),
        )
        .await
    };
}

async fn connect() -> PgPool {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB")
}

/// Deletes any leftover account (and its tasks) from a previous run.
async fn cleanup(pool: &PgPool, email: &str) {
    let _ = sqlx::query(
        "DELETE FROM tasks WHERE owner IN (SELECT id FROM users WHERE email = $1)",
    )
    .bind(email)
    .execute(pool)
    .await;
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

async fn register_user<S, B>(app: &S, name: &str, email: &str, password: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Registration failed. Body: {:?}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse registration response")
}

async fn get_profile<S, B>(app: &S, token: &str) -> StatusCode
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    test::call_service(app, req).await.status()
}

fn multipart_body(filename: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----tasknest-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"{}\"\r\n\
             Content-Type: {}\r\n\r\n",
            boundary, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (
        format!("multipart/form-data; boundary={}", boundary),
        body,
    )
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn register_login_and_profile_flow() {
    let pool = connect().await;
    let email = "flow@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Flow User", email, "abc123").await;
    let token = registered["token"].as_str().expect("token in response");
    assert!(!token.is_empty());

    // The account on the wire never carries credentials or the avatar.
    let user = registered["user"].as_object().expect("user object");
    assert!(!user.contains_key("password"));
    assert!(!user.contains_key("tokens"));
    assert!(!user.contains_key("avatar"));
    assert_eq!(user["email"], email);
    assert_eq!(user["age"], 0);

    // The freshly issued token opens the profile.
    assert_eq!(get_profile(&app, token).await, StatusCode::OK);

    // Logging in issues a second, independent token.
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "abc123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login_body: Value = test::read_body_json(resp).await;
    assert!(!login_body["token"].as_str().unwrap().is_empty());

    // A wrong password and an unknown email fail identically.
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "wrong-secret" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let wrong_password_body = test::read_body(resp).await;

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": "nobody@example.com", "password": "abc123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let unknown_email_body = test::read_body(resp).await;

    assert_eq!(wrong_password_body, unknown_email_body);

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn registration_rejects_invalid_input() {
    let pool = connect().await;
    let email = "invalid-input@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let test_cases = vec![
        (
            json!({ "name": "A", "email": "not-an-email", "password": "abc123" }),
            "email lacking an @",
        ),
        (
            json!({ "name": "A", "email": email, "password": "abc12" }),
            "password one character too short",
        ),
        (
            json!({ "name": "A", "email": email, "password": "password123" }),
            "password containing the forbidden word",
        ),
        (
            json!({ "name": "A", "email": email, "password": "PASSWORDabc" }),
            "forbidden word in upper case",
        ),
    ];

    for (payload, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "Test case failed: {}",
            description
        );
    }

    // Duplicate registration fails after the first one succeeds.
    register_user(&app, "First", email, "abc123").await;
    let req = test::TestRequest::post()
        .uri("/users")
        .set_json(json!({ "name": "Second", "email": email, "password": "abc123" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn logout_revokes_only_the_presented_token() {
    let pool = connect().await;
    let email = "logout@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Logout User", email, "abc123").await;
    let first_token = registered["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "abc123" }))
        .to_request();
    let login_body: Value = test::call_and_read_body_json(&app, req).await;
    let second_token = login_body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/users/logout")
        .append_header(("Authorization", format!("Bearer {}", first_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // The revoked token is dead even though its signature is still valid;
    // the other session is untouched.
    assert_eq!(get_profile(&app, &first_token).await, StatusCode::UNAUTHORIZED);
    assert_eq!(get_profile(&app, &second_token).await, StatusCode::OK);

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn logout_all_revokes_every_token() {
    let pool = connect().await;
    let email = "logoutall@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Logout All", email, "abc123").await;
    let first_token = registered["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "abc123" }))
        .to_request();
    let login_body: Value = test::call_and_read_body_json(&app, req).await;
    let second_token = login_body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/users/logoutall")
        .append_header(("Authorization", format!("Bearer {}", second_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(get_profile(&app, &first_token).await, StatusCode::UNAUTHORIZED);
    assert_eq!(get_profile(&app, &second_token).await, StatusCode::UNAUTHORIZED);

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn profile_update_respects_the_allow_list() {
    let pool = connect().await;
    let email = "patch@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Patch User", email, "abc123").await;
    let token = registered["token"].as_str().unwrap().to_string();

    // An allowed field is applied.
    let req = test::TestRequest::patch()
        .uri("/users/me")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "age": 30 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["age"], 30);

    // An unknown key is rejected wholesale, even next to valid fields.
    for payload in [
        json!({ "role": "admin" }),
        json!({ "name": "Sneaky", "role": "admin" }),
    ] {
        let req = test::TestRequest::patch()
            .uri("/users/me")
            .append_header(("Authorization", format!("Bearer {}", token)))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid Updates");
    }

    // The valid field riding along with the bad one was not applied.
    let req = test::TestRequest::get()
        .uri("/users/me")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["name"], "Patch User");

    // Changing the password rehashes it: the new one logs in, the old fails.
    let req = test::TestRequest::patch()
        .uri("/users/me")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "password": "newsecret1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "newsecret1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "abc123" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn avatar_upload_normalizes_and_serves_png() {
    let pool = connect().await;
    let email = "avatar@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Avatar User", email, "abc123").await;
    let token = registered["token"].as_str().unwrap().to_string();
    let user_id = registered["user"]["id"].as_str().unwrap().to_string();

    // A text file is refused outright.
    let (content_type, body) = multipart_body("x.txt", "text/plain", b"hello world");
    let req = test::TestRequest::post()
        .uri("/users/me/avatar")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error_body: Value = test::read_body_json(resp).await;
    assert!(error_body["err"].is_string());

    // A real JPEG is normalized to a 250x250 PNG.
    let source = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        2000,
        2000,
        image::Rgb([10, 120, 200]),
    ));
    let mut jpeg = Vec::new();
    source
        .write_to(
            &mut std::io::Cursor::new(&mut jpeg),
            image::ImageFormat::Jpeg,
        )
        .unwrap();

    let (content_type, body) = multipart_body("photo.jpg", "image/jpeg", &jpeg);
    let req = test::TestRequest::post()
        .uri("/users/me/avatar")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", user_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "image/png"
    );
    let stored = test::read_body(resp).await;
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!(decoded.width(), 250);
    assert_eq!(decoded.height(), 250);
    assert_eq!(
        image::guess_format(&stored).unwrap(),
        image::ImageFormat::Png
    );

    // Clearing the avatar makes the public fetch a 404.
    let req = test::TestRequest::delete()
        .uri("/users/me/avatar")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/users/{}/avatar", user_id))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    cleanup(&pool, email).await;
}

// Requires a running Postgres with schema.sql applied.
#[ignore]
#[actix_rt::test]
async fn deleting_an_account_cascades_to_its_tasks() {
    let pool = connect().await;
    let email = "cascade@example.com";
    cleanup(&pool, email).await;

    let app = test_app!(pool);

    let registered = register_user(&app, "Cascade User", email, "abc123").await;
    let token = registered["token"].as_str().unwrap().to_string();
    let user_id = registered["user"]["id"].as_str().unwrap().to_string();

    for description in ["first task", "second task"] {
        let req = test::TestRequest::post()
            .uri("/tasks")
            .append_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "description": description }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::delete()
        .uri("/users/me")
        .append_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["email"], email);

    // Every task owned by the account went with it.
    let remaining: i64 =
        sqlx::query_scalar("SELECT count(*) FROM tasks WHERE owner = $1::uuid")
            .bind(&user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);

    // And the account itself is gone.
    let req = test::TestRequest::post()
        .uri("/users/login")
        .set_json(json!({ "email": email, "password": "abc123" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}
