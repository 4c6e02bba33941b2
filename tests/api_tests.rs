// tests/api_tests.rs

mod common;

use common::{PASSWORD, oversized, spawn_app};
use serde_json::{Value, json};

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app(false).await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn first_signup_bypasses_gate_and_becomes_admin() {
    let app = spawn_app(false).await;

    let response = app
        .post("/auth/signup", None, json!({ "email": "a@x.com", "password": "pw" }))
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "a@x.com");
    assert!(body["id"].is_string());
    assert!(body["name"].is_null());
    assert!(body.get("password").is_none());

    assert_eq!(app.user_flags("a@x.com").await, (true, false));
}

#[tokio::test]
async fn closed_gate_rejects_every_later_signup() {
    let app = spawn_app(false).await;
    app.register("first@x.com").await;

    let response = app.signup("second@x.com").await;
    assert_eq!(response.status().as_u16(), 401);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn open_gate_creates_regular_users() {
    let app = spawn_app(true).await;
    app.register("first@x.com").await;
    app.register("second@x.com").await;

    assert_eq!(app.user_flags("first@x.com").await, (true, false));
    assert_eq!(app.user_flags("second@x.com").await, (false, false));
}

#[tokio::test]
async fn signup_requires_email_and_password() {
    let app = spawn_app(true).await;

    let response = app.post("/auth/signup", None, json!({ "email": "a@x.com" })).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post("/auth/signup", None, json!({ "email": "", "password": "pw" }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_signup_is_rejected() {
    let app = spawn_app(true).await;
    app.register("a@x.com").await;

    let response = app.signup("a@x.com").await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "User already exists");
}

#[tokio::test]
async fn availability_follows_gate_and_bootstrap() {
    let app = spawn_app(false).await;

    let open: bool = app.get("/auth/userAvailability", None).await.json().await.unwrap();
    assert!(open, "empty store always allows the first signup");

    app.register("a@x.com").await;
    let open: bool = app.get("/auth/userAvailability", None).await.json().await.unwrap();
    assert!(!open);
}

#[tokio::test]
async fn public_config_hides_secrets() {
    let app = spawn_app(true).await;

    let body: Value = app.get("/config", None).await.json().await.unwrap();
    assert_eq!(body["allowSignups"], true);
    assert_eq!(body["platformTitle"], "Test Platform");
    assert!(body.get("jwtSecret").is_none());
}

#[tokio::test]
async fn login_checks_password() {
    let app = spawn_app(true).await;
    app.register("a@x.com").await;

    let response = app
        .post("/auth/login", None, json!({ "email": "a@x.com", "password": "nope" }))
        .await;
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .post("/auth/login", None, json!({ "email": "ghost@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = spawn_app(true).await;

    let response = app.post("/blog/create", None, json!({ "blogTitle": "t" })).await;
    assert_eq!(response.status().as_u16(), 401);

    let response = app
        .post("/blog/create", Some("not-a-token"), json!({ "blogTitle": "t" }))
        .await;
    assert_eq!(response.status().as_u16(), 401);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "You are not authorized to call this API.");
}

#[tokio::test]
async fn user_update_only_writes_changes() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;

    let hash_before: String = sqlx::query_scalar("SELECT password FROM users WHERE email = 'a@x.com'")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    // Same password again, plus a real change.
    let response = app
        .post(
            "/user/update",
            Some(&token),
            json!({ "password": PASSWORD, "website": "https://a.example" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["website"], "https://a.example");
    assert!(body.get("password").is_none());

    let hash_after: String = sqlx::query_scalar("SELECT password FROM users WHERE email = 'a@x.com'")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(hash_before, hash_after, "unchanged password must not be rehashed");

    // A different password is rehashed and becomes the login password.
    let response = app
        .post("/user/update", Some(&token), json!({ "password": "new-secret" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let new_token = app.login("a@x.com", "new-secret").await;
    assert!(!new_token.is_empty());

    let website: Value = app
        .get("/user/getWebsite?email=a@x.com", None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(website["website"], "https://a.example");
}

#[tokio::test]
async fn empty_user_patch_is_a_no_op() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;

    let updated_before: String =
        sqlx::query_scalar("SELECT updated_at FROM users WHERE email = 'a@x.com'")
            .fetch_one(&app.pool)
            .await
            .unwrap();

    let response = app
        .post("/user/update", Some(&token), json!({ "name": "a@x.com" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let updated_after: String =
        sqlx::query_scalar("SELECT updated_at FROM users WHERE email = 'a@x.com'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(updated_before, updated_after);
}

#[tokio::test]
async fn user_email_must_stay_unique() {
    let app = spawn_app(true).await;
    app.register("a@x.com").await;
    let token_b = app.register("b@x.com").await;

    let response = app
        .post("/user/update", Some(&token_b), json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn frozen_user_cannot_update_profile() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;
    app.set_frozen("a@x.com", true).await;

    let response = app
        .post("/user/update", Some(&token), json!({ "name": "new" }))
        .await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn freeze_toggle_flips_back_and_forth() {
    let app = spawn_app(true).await;
    let admin = app.register("admin@x.com").await;
    app.register("target@x.com").await;

    let body = json!({ "userToUpdate": { "email": "target@x.com" } });

    let response = app.post("/admin/updateFrozenStatus", Some(&admin), body.clone()).await;
    assert_eq!(response.status().as_u16(), 200);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["frozen"], true);
    assert_eq!(app.user_flags("target@x.com").await, (false, true));

    let response = app.post("/admin/updateFrozenStatus", Some(&admin), body).await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.user_flags("target@x.com").await, (false, false));
}

#[tokio::test]
async fn admin_operations_reject_regular_users() {
    let app = spawn_app(true).await;
    app.register("admin@x.com").await;
    let regular = app.register("regular@x.com").await;

    let response = app
        .post(
            "/admin/updateFrozenStatus",
            Some(&regular),
            json!({ "userToUpdate": { "email": "admin@x.com" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "You are not authorized to call this API. You are not an admin."
    );
    assert_eq!(app.user_flags("admin@x.com").await, (true, false));

    let response = app.get("/admin/getAllUsers", Some(&regular)).await;
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_grant_requires_restated_identity() {
    let app = spawn_app(true).await;
    let admin = app.register("admin@x.com").await;
    app.register("target@x.com").await;

    let response = app
        .post(
            "/admin/update",
            Some(&admin),
            json!({ "email": "someone@x.com", "userToUpdate": { "email": "target@x.com" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "You are not authorized to call this API. You are not who you say you are."
    );
    assert_eq!(app.user_flags("target@x.com").await, (false, false));

    let response = app
        .post(
            "/admin/update",
            Some(&admin),
            json!({ "email": "admin@x.com", "userToUpdate": { "email": "target@x.com" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.user_flags("target@x.com").await, (true, false));
}

#[tokio::test]
async fn admin_toggle_of_missing_user_is_422() {
    let app = spawn_app(true).await;
    let admin = app.register("admin@x.com").await;

    let response = app
        .post(
            "/admin/updateFrozenStatus",
            Some(&admin),
            json!({ "userToUpdate": { "email": "ghost@x.com" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn admin_listing_excludes_passwords() {
    let app = spawn_app(true).await;
    let admin = app.register("admin@x.com").await;
    let other = app.register("other@x.com").await;
    app.create_blog(&other, "Other's Blog").await;

    let response = app.get("/admin/getAllUsers", Some(&admin)).await;
    assert_eq!(response.status().as_u16(), 200);
    let users: Vec<Value> = response.json().await.unwrap();

    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    let other = users.iter().find(|u| u["email"] == "other@x.com").unwrap();
    assert_eq!(other["blog"]["title"], "Other's Blog");
    let admin = users.iter().find(|u| u["email"] == "admin@x.com").unwrap();
    assert!(admin["blog"].is_null());
}

#[tokio::test]
async fn deleting_an_account_cascades() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;
    app.create_blog(&token, "Doomed").await;
    let post = app.create_post(&token, "Last words").await;
    let response = app
        .post(
            "/blog/posts/images/create",
            Some(&token),
            json!({ "postId": post["id"], "image": "data:image/png;base64,AAAA" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);

    let response = app.post("/user/delete", Some(&token), json!({})).await;
    assert_eq!(response.status().as_u16(), 204);

    for table in ["users", "blogs", "posts", "images"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} should be empty", table);
    }

    // The token outlives the account but no longer resolves to a user.
    let response = app.post("/blog/posts/create", Some(&token), json!({})).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn oversized_signup_fields_create_no_user() {
    let app = spawn_app(true).await;

    let response = app
        .post(
            "/auth/signup",
            None,
            json!({ "email": "a@x.com", "password": PASSWORD, "username": oversized() }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post(
            "/auth/signup",
            None,
            json!({ "email": "a@x.com", "password": oversized() }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}

#[tokio::test]
async fn oversized_profile_fields_leave_user_unchanged() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;

    for field in ["email", "name", "website", "image", "password"] {
        let response = app
            .post("/user/update", Some(&token), json!({ field: oversized() }))
            .await;
        assert_eq!(response.status().as_u16(), 400, "{} was accepted", field);
    }

    let (email, name, website): (String, Option<String>, Option<String>) =
        sqlx::query_as("SELECT email, name, website FROM users")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(email, "a@x.com");
    assert_eq!(name.as_deref(), Some("a@x.com"));
    assert!(website.is_none());

    // The session still works, so nothing above was half-applied.
    app.login("a@x.com", PASSWORD).await;
}

#[tokio::test]
async fn profile_email_must_be_an_address() {
    let app = spawn_app(true).await;
    let token = app.register("a@x.com").await;

    let response = app
        .post("/user/update", Some(&token), json!({ "email": "not-an-address" }))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert!(app.get("/user/getWebsite?email=a@x.com", None).await.status().is_success());
}

#[tokio::test]
async fn changing_email_hands_out_a_new_session() {
    let app = spawn_app(true).await;
    let old_token = app.register("a@x.com").await;

    let response = app
        .post("/user/update", Some(&old_token), json!({ "website": "https://a.example" }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert!(body.get("token").is_none());

    let response = app
        .post("/user/update", Some(&old_token), json!({ "email": "b@x.com" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "b@x.com");
    let new_token = body["token"].as_str().expect("token missing").to_string();

    let response = app
        .post("/user/update", Some(&old_token), json!({ "name": "x" }))
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .post("/user/update", Some(&new_token), json!({ "name": "Bea" }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Bea");
}

#[tokio::test]
async fn admin_toggle_reports_the_target_blog() {
    let app = spawn_app(true).await;
    let admin = app.register("admin@x.com").await;
    let owner = app.register("owner@x.com").await;
    let blog_id = app.create_blog(&owner, "Owned").await;

    let response = app
        .post(
            "/admin/updateFrozenStatus",
            Some(&admin),
            json!({ "userToUpdate": { "email": "owner@x.com" } }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["frozen"], true);
    assert_eq!(user["blog"], json!({ "id": blog_id, "title": "Owned" }));
    assert!(user.get("password").is_none());
}
