use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn profile_is_not_found_until_written() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let own = app.get_with_token(routes::PROFILE, &alice.token).await;
    let public = app.get_without_token(&routes::profile(alice.id)).await;

    assert_eq!(own.status, 404);
    assert_eq!(public.status, 404);
}

#[tokio::test]
async fn create_then_read_profile() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .post_with_token(
            routes::PROFILE,
            &json!({
                "bio": "Home cook.",
                "pronouns": "she/her",
                "image_url": "https://img.example.com/alice.png",
            }),
            &alice.token,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);

    let public = app.get_without_token(&routes::profile(alice.id)).await;
    assert_eq!(public.status, 200);
    assert_eq!(public.body["user_id"], alice.id);
    assert_eq!(public.body["username"], "alice");
    assert_eq!(public.body["bio"], "Home cook.");
    assert_eq!(public.body["pronouns"], "she/her");
    assert_eq!(public.body["image_url"], "https://img.example.com/alice.png");
}

#[tokio::test]
async fn creating_a_second_profile_conflicts() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let first = app
        .post_with_token(routes::PROFILE, &json!({"bio": "one"}), &alice.token)
        .await;
    assert_eq!(first.status, 201);

    let second = app
        .post_with_token(routes::PROFILE, &json!({"bio": "two"}), &alice.token)
        .await;
    assert_eq!(second.status, 409);
    assert_eq!(second.body["code"], "CONFLICT");
}

#[tokio::test]
async fn upsert_creates_lazily_and_updates_display_name() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .put_with_token(
            routes::PROFILE,
            &json!({"display_name": "Chef Alice", "pronouns": "she/her"}),
            &alice.token,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["display_name"], "Chef Alice");

    let res = app
        .put_with_token(routes::PROFILE, &json!({"pronouns": null}), &alice.token)
        .await;
    assert_eq!(res.status, 200);
    assert!(res.body["pronouns"].is_null());
    assert_eq!(res.body["display_name"], "Chef Alice");

    let me = app.get_with_token(routes::ME, &alice.token).await;
    assert_eq!(me.body["display_name"], "Chef Alice");
}

#[tokio::test]
async fn image_url_must_be_http() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .put_with_token(
            routes::PROFILE,
            &json!({"image_url": "javascript:alert(1)"}),
            &alice.token,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    assert_eq!(app.get_with_token(routes::PROFILE, &alice.token).await.status, 404);
}

async fn send_profile_writes(
    app: &TestApp,
    token: &str,
    method: reqwest::Method,
    count: usize,
) -> Vec<u16> {
    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..count {
        let request = app
            .client
            .request(method.clone(), app.url(routes::PROFILE))
            .header("Authorization", format!("Bearer {token}"))
            .json(&json!({"bio": format!("Take {n}")}));
        tasks.spawn(async move {
            request
                .send()
                .await
                .expect("Failed to send profile request")
                .status()
                .as_u16()
        });
    }

    let mut statuses = Vec::new();
    while let Some(status) = tasks.join_next().await {
        statuses.push(status.unwrap());
    }
    statuses.sort();
    statuses
}

#[tokio::test]
async fn concurrent_first_upserts_all_succeed() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let statuses = send_profile_writes(&app, &alice.token, reqwest::Method::PUT, 6).await;

    assert_eq!(statuses, vec![200; 6]);
    let res = app.get_with_token(routes::PROFILE, &alice.token).await;
    assert_eq!(res.status, 200);
    assert!(res.body["bio"].as_str().unwrap().starts_with("Take "));
}

#[tokio::test]
async fn concurrent_creates_yield_one_profile_and_conflicts() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let statuses = send_profile_writes(&app, &alice.token, reqwest::Method::POST, 6).await;

    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1, "{statuses:?}");
    assert_eq!(statuses.iter().filter(|s| **s == 409).count(), 5, "{statuses:?}");
}
