use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn saving_twice_is_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    let id = app.create_recipe(&alice.token, "Granola", json!([])).await;

    let first = app.post_with_token(&routes::save(id), &json!({}), &alice.token).await;
    assert_eq!(first.status, 201, "{}", first.text);
    assert_eq!(first.body["recipe_id"], id);

    let second = app.post_with_token(&routes::save(id), &json!({}), &alice.token).await;
    assert_eq!(second.status, 400);
    assert_eq!(second.body["code"], "DUPLICATE");

    let saved = app.get_with_token(routes::SAVED_RECIPES, &alice.token).await;
    assert_eq!(saved.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unsave_removes_only_that_pair() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    let bob = app.create_authenticated_user("bob").await;
    let granola = app.create_recipe(&alice.token, "Granola", json!([])).await;
    let muesli = app.create_recipe(&alice.token, "Muesli", json!([])).await;

    for (token, id) in [
        (&alice.token, granola),
        (&alice.token, muesli),
        (&bob.token, granola),
    ] {
        let res = app.post_with_token(&routes::save(id), &json!({}), token).await;
        assert_eq!(res.status, 201);
    }

    let res = app.delete_with_token(&routes::save(granola), &alice.token).await;
    assert_eq!(res.status, 204);

    let alice_saved = app.get_with_token(routes::SAVED_RECIPES, &alice.token).await;
    let ids: Vec<i64> = alice_saved
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["recipe"]["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [i64::from(muesli)]);

    let bob_saved = app.get_with_token(routes::SAVED_RECIPES, &bob.token).await;
    assert_eq!(bob_saved.body.as_array().unwrap().len(), 1);

    let again = app.delete_with_token(&routes::save(granola), &alice.token).await;
    assert_eq!(again.status, 404);
}

#[tokio::test]
async fn saved_list_is_newest_first_with_full_detail() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin").await;
    let alice = app.create_authenticated_user("alice").await;
    let oats = app.create_ingredient(&admin.token, "Oats", "Grains").await;
    let first = app
        .create_recipe(
            &alice.token,
            "Porridge",
            json!([{"ingredient_id": oats, "quantity": "80 g"}]),
        )
        .await;
    let second = app.create_recipe(&alice.token, "Flapjack", json!([])).await;

    app.post_with_token(&routes::save(first), &json!({}), &alice.token).await;
    app.post_with_token(&routes::save(second), &json!({}), &alice.token).await;

    let res = app.get_with_token(routes::SAVED_RECIPES, &alice.token).await;

    assert_eq!(res.status, 200);
    let list = res.body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["recipe"]["name"], "Flapjack");
    assert_eq!(list[1]["recipe"]["name"], "Porridge");
    assert_eq!(list[1]["recipe"]["ingredients"][0]["name"], "Oats");
    assert!(list[1]["saved_at"].is_string());
}

#[tokio::test]
async fn saving_a_missing_recipe_is_not_found() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app
        .post_with_token(&routes::save(999_999), &json!({}), &alice.token)
        .await;

    assert_eq!(res.status, 404);
}
