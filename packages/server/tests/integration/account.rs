use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use recipebox_server::entity::{rating, recipe, recipe_ingredient, saved_recipe, user};

use crate::common::{TestApp, routes};

#[tokio::test]
async fn deleting_an_account_removes_profile_saves_and_recipes() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin").await;
    let alice = app.create_authenticated_user("alice").await;
    let bob = app.create_authenticated_user("bob").await;

    let flour = app.create_ingredient(&admin.token, "Flour", "Baking").await;
    let alice_recipe = app
        .create_recipe(
            &alice.token,
            "Alice's Bread",
            json!([{"ingredient_id": flour, "quantity": "500 g"}]),
        )
        .await;
    let bob_recipe = app.create_recipe(&bob.token, "Bob's Soup", json!([])).await;

    let res = app
        .put_with_token(routes::PROFILE, &json!({"bio": "I bake."}), &alice.token)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    // Alice saves and rates Bob's recipe; Bob saves and rates Alice's.
    assert_eq!(
        app.post_with_token(&routes::save(bob_recipe), &json!({}), &alice.token)
            .await
            .status,
        201
    );
    assert_eq!(
        app.post_with_token(&routes::save(alice_recipe), &json!({}), &bob.token)
            .await
            .status,
        201
    );
    app.rate(&alice.token, bob_recipe, 2).await;
    app.rate(&admin.token, bob_recipe, 5).await;
    app.rate(&bob.token, alice_recipe, 4).await;

    let res = app.delete_with_token(&routes::user(alice.id), &alice.token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["user_id"], alice.id);
    assert_eq!(res.body["profiles"], 1);
    assert_eq!(res.body["saved_recipes"], 1);
    assert_eq!(res.body["recipes"], 1);
    assert_eq!(res.body["ratings"], 1);

    assert_eq!(
        app.get_without_token(&routes::profile(alice.id)).await.status,
        404
    );
    assert_eq!(
        app.get_without_token(&routes::recipe(alice_recipe)).await.status,
        404
    );

    let listed = app
        .get_without_token(&format!("{}?user_id={}", routes::RECIPES, alice.id))
        .await;
    assert_eq!(listed.body["pagination"]["total"], 0);

    // Rows pointing at the deleted recipe are gone for other users too.
    let bob_saves = app.get_with_token(routes::SAVED_RECIPES, &bob.token).await;
    assert_eq!(bob_saves.body.as_array().unwrap().len(), 0);
    let leftover_lines = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(alice_recipe))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(leftover_lines, 0);
    let leftover_saves = saved_recipe::Entity::find()
        .filter(saved_recipe::Column::UserId.eq(alice.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(leftover_saves, 0);

    // Alice's rating no longer counts towards Bob's recipe.
    let bob_recipe_row = recipe::Entity::find_by_id(bob_recipe)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob_recipe_row.average_rating, Some(5.0));
    let remaining = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(bob_recipe))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn deleted_account_can_no_longer_use_its_token() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app.delete_with_token(&routes::user(alice.id), &alice.token).await;
    assert_eq!(res.status, 200);

    let me = app.get_with_token(routes::ME, &alice.token).await;
    assert_eq!(me.status, 401);
    assert_eq!(me.body["code"], "TOKEN_INVALID");

    let saved = app.get_with_token(routes::SAVED_RECIPES, &alice.token).await;
    assert_eq!(saved.status, 401);

    assert_eq!(app.login("alice", crate::common::PASSWORD).await.status, 401);
}

#[tokio::test]
async fn users_cannot_delete_other_accounts() {
    let app = TestApp::spawn().await;
    let alice = app.create_authenticated_user("alice").await;
    let mallory = app.create_authenticated_user("mallory").await;

    let res = app.delete_with_token(&routes::user(alice.id), &mallory.token).await;

    assert_eq!(res.status, 403);
    assert_eq!(app.get_with_token(routes::ME, &alice.token).await.status, 200);
}

#[tokio::test]
async fn admin_can_delete_any_account() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin").await;
    let alice = app.create_authenticated_user("alice").await;

    let res = app.delete_with_token(&routes::user(alice.id), &admin.token).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(app.get_with_token(routes::ME, &alice.token).await.status, 401);
}

#[tokio::test]
async fn deleted_admin_token_cannot_delete_accounts() {
    let app = TestApp::spawn().await;
    let former = app.create_admin("former").await;
    let admin = app.create_admin("admin").await;
    let bob = app.create_authenticated_user("bob").await;

    let res = app.delete_with_token(&routes::user(former.id), &admin.token).await;
    assert_eq!(res.status, 200, "{}", res.text);

    let res = app.delete_with_token(&routes::user(bob.id), &former.token).await;
    assert_eq!(res.status, 401);
    assert_eq!(app.get_with_token(routes::ME, &bob.token).await.status, 200);
}

#[tokio::test]
async fn demoted_admin_loses_rights_before_token_expiry() {
    let app = TestApp::spawn().await;
    let former = app.create_admin("former").await;
    let bob = app.create_authenticated_user("bob").await;

    let row = user::Entity::find_by_id(former.id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: user::ActiveModel = row.into();
    active.is_admin = Set(false);
    user::Entity::update(active).exec(&app.db).await.unwrap();

    let res = app.delete_with_token(&routes::user(bob.id), &former.token).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
    assert_eq!(
        app.get_with_token(routes::ADMIN_STATS, &former.token).await.status,
        403
    );
}

#[tokio::test]
async fn deleting_a_missing_account_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin").await;

    let res = app.delete_with_token(&routes::user(999_999), &admin.token).await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}
