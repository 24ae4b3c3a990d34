use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use recipebox_server::entity::{recipe, recipe_ingredient};

use crate::common::{TestApp, routes};

mod create {
    use super::*;

    #[tokio::test]
    async fn creates_recipe_with_ingredient_lines() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient(&admin.token, "Flour", "Baking").await;
        let eggs = app.create_ingredient(&admin.token, "Eggs", "Dairy").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Pancakes",
                    "description": "Fluffy.",
                    "instructions": "Whisk, rest, fry.",
                    "time_to_make": 25,
                    "ingredients": [
                        {"ingredient_id": flour, "quantity": "200 g"},
                        {"ingredient_id": eggs, "quantity": "2"},
                    ],
                }),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Pancakes");
        assert_eq!(res.body["user_id"], alice.id);
        assert_eq!(res.body["author_username"], "alice");
        assert_eq!(res.body["is_approved"], false);
        assert!(res.body["average_rating"].is_null());
        assert_eq!(res.body["ingredients"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_ingredient_leaves_no_recipe_behind() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_authenticated_user("alice").await;
        let flour = app.create_ingredient(&admin.token, "Flour", "Baking").await;

        let res = app
            .post_with_token(
                routes::RECIPES,
                &json!({
                    "name": "Broken Bread",
                    "instructions": "Knead.",
                    "time_to_make": 90,
                    "ingredients": [
                        {"ingredient_id": flour, "quantity": "500 g"},
                        {"ingredient_id": 999_999, "quantity": "1"},
                    ],
                }),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(recipe::Entity::find().count(&app.db).await.unwrap(), 0);
        assert_eq!(
            recipe_ingredient::Entity::find().count(&app.db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn rejects_invalid_fields() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        for body in [
            json!({"name": "", "instructions": "x", "time_to_make": 1}),
            json!({"name": "Soup", "instructions": "", "time_to_make": 1}),
            json!({"name": "Soup", "instructions": "Boil.", "time_to_make": -5}),
            json!({
                "name": "Soup",
                "instructions": "Boil.",
                "time_to_make": 5,
                "ingredients": [
                    {"ingredient_id": 1, "quantity": "1"},
                    {"ingredient_id": 1, "quantity": "2"},
                ],
            }),
        ] {
            let res = app.post_with_token(routes::RECIPES, &body, &alice.token).await;
            assert_eq!(res.status, 400, "accepted {body}");
        }
        assert_eq!(recipe::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::RECIPES,
                &json!({"name": "Soup", "instructions": "Boil.", "time_to_make": 5}),
            )
            .await;

        assert_eq!(res.status, 401);
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn searches_names_case_insensitively_and_paginates() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        for name in ["Tomato Soup", "Pea Soup", "Apple Pie", "100% Rye"] {
            app.create_recipe(&alice.token, name, json!([])).await;
        }

        let res = app
            .get_without_token(&format!("{}?search=SOUP", routes::RECIPES))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .get_without_token(&format!("{}?search=%25", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "100% Rye");

        let res = app
            .get_without_token(&format!("{}?per_page=3&page=2", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 4);
        assert_eq!(res.body["pagination"]["total_pages"], 2);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_page_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        app.create_recipe(&alice.token, "Tomato Soup", json!([])).await;

        let res = app
            .get_without_token(&format!("{}?page={}", routes::RECIPES, u64::MAX))
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .get_without_token(&format!("{}?page=1000&per_page=100", routes::RECIPES))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn sorts_by_name_and_rating_with_unrated_last() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let a = app.create_recipe(&alice.token, "Bagels", json!([])).await;
        let b = app.create_recipe(&alice.token, "Curry", json!([])).await;
        app.create_recipe(&alice.token, "Adobo", json!([])).await;
        app.rate(&bob.token, a, 3).await;
        app.rate(&bob.token, b, 5).await;

        let res = app
            .get_without_token(&format!("{}?sort_by=name&sort_order=asc", routes::RECIPES))
            .await;
        let names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Adobo", "Bagels", "Curry"]);

        let res = app
            .get_without_token(&format!(
                "{}?sort_by=average_rating&sort_order=desc",
                routes::RECIPES
            ))
            .await;
        let names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Curry", "Bagels", "Adobo"]);
    }

    #[tokio::test]
    async fn rejects_unknown_sort_field() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?sort_by=calories", routes::RECIPES))
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn filters_by_approval() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_authenticated_user("alice").await;
        let approved = app.create_recipe(&alice.token, "Approved", json!([])).await;
        app.create_recipe(&alice.token, "Pending", json!([])).await;

        let res = app
            .put_with_token(
                &routes::recipe_approval(approved),
                &json!({"approved": true}),
                &admin.token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_approved"], true);

        let res = app
            .get_without_token(&format!("{}?approved=true", routes::RECIPES))
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Approved");
    }
}

mod detail_and_delete {
    use super::*;

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::recipe(999_999)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn only_owner_or_admin_can_delete() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_authenticated_user("alice").await;
        let bob = app.create_authenticated_user("bob").await;
        let first = app.create_recipe(&alice.token, "First", json!([])).await;
        let second = app.create_recipe(&alice.token, "Second", json!([])).await;

        let res = app.delete_with_token(&routes::recipe(first), &bob.token).await;
        assert_eq!(res.status, 403);

        app.rate(&bob.token, first, 4).await;
        let res = app.post_with_token(&routes::save(first), &json!({}), &bob.token).await;
        assert_eq!(res.status, 201);

        let res = app.delete_with_token(&routes::recipe(first), &alice.token).await;
        assert_eq!(res.status, 204);
        assert_eq!(app.get_without_token(&routes::recipe(first)).await.status, 404);
        let saved = app.get_with_token(routes::SAVED_RECIPES, &bob.token).await;
        assert_eq!(saved.body.as_array().unwrap().len(), 0);

        let res = app.delete_with_token(&routes::recipe(second), &admin.token).await;
        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn approval_is_admin_only() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let id = app.create_recipe(&alice.token, "Mine", json!([])).await;

        let res = app
            .put_with_token(
                &routes::recipe_approval(id),
                &json!({"approved": true}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}
