use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

mod signup {
    use super::*;

    #[tokio::test]
    async fn new_user_can_sign_up_with_valid_details() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({
                    "email": "Alice@Example.com",
                    "username": "alice",
                    "display_name": "Alice A.",
                    "password": PASSWORD,
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["id"].is_number());
        assert_eq!(res.body["username"], "alice");
        assert_eq!(res.body["email"], "alice@example.com");
        assert_eq!(res.body["display_name"], "Alice A.");
        assert_eq!(res.body["is_admin"], false);
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn display_name_defaults_to_the_username() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "bob@example.com", "username": "bob", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["display_name"], "bob");
    }

    #[tokio::test]
    async fn cannot_sign_up_with_an_already_taken_username() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "other@example.com", "username": "alice", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn cannot_sign_up_with_an_already_taken_email() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app
            .post_without_token(
                routes::SIGNUP,
                &json!({"email": "ALICE@example.com", "username": "alice2", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn concurrent_signups_sharing_an_email_report_email_taken() {
        let app = TestApp::spawn().await;

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..5 {
            let request = app.client.post(app.url(routes::SIGNUP)).json(&json!({
                "email": "shared@example.com",
                "username": format!("cook_{n}"),
                "password": PASSWORD,
            }));
            tasks.spawn(async move {
                let res = request.send().await.expect("Failed to send signup");
                let status = res.status().as_u16();
                let body: serde_json::Value = res.json().await.unwrap();
                (status, body["code"].as_str().map(str::to_owned))
            });
        }

        let mut created = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                (201, _) => created += 1,
                (status, code) => {
                    assert_eq!(status, 409);
                    assert_eq!(code.as_deref(), Some("EMAIL_TAKEN"));
                }
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn rejects_short_passwords_invalid_usernames_and_bad_emails() {
        let app = TestApp::spawn().await;

        for body in [
            json!({"email": "a@example.com", "username": "alice", "password": "short"}),
            json!({"email": "a@example.com", "username": "no spaces!", "password": PASSWORD}),
            json!({"email": "not-an-email", "username": "alice", "password": PASSWORD}),
            json!({"username": "alice", "password": PASSWORD}),
        ] {
            let res = app.post_without_token(routes::SIGNUP, &body).await;
            assert_eq!(res.status, 400, "accepted {body}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn returns_a_token_and_the_user() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app.login("alice", PASSWORD).await;

        assert_eq!(res.status, 200);
        assert!(res.body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert!(res.body["expires_at"].is_string());
        assert_eq!(res.body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn accepts_the_email_address_as_login() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let res = app.login("Alice@Example.com", PASSWORD).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_indistinguishable() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("alice").await;

        let wrong = app.login("alice", "wrong-password").await;
        let unknown = app.login("nobody", PASSWORD).await;

        assert_eq!(wrong.status, 401);
        assert_eq!(unknown.status, 401);
        assert_eq!(wrong.body["code"], "INVALID_CREDENTIALS");
        assert_eq!(wrong.body, unknown.body);
    }
}

mod me {
    use super::*;

    #[tokio::test]
    async fn returns_the_authenticated_user() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app.get_with_token(routes::ME, &alice.token).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["id"], alice.id);
        assert_eq!(res.body["username"], "alice");
    }

    #[tokio::test]
    async fn requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn rejects_a_forged_token() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}

mod change_password {
    use super::*;

    #[tokio::test]
    async fn owner_can_change_password_and_log_in_with_the_new_one() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .put_with_token(
                &routes::user_password(alice.id),
                &json!({"current_password": PASSWORD, "new_password": "a-new-password"}),
                &alice.token,
            )
            .await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert_eq!(app.login("alice", PASSWORD).await.status, 401);
        assert_eq!(app.login("alice", "a-new-password").await.status, 200);
    }

    #[tokio::test]
    async fn wrong_current_password_is_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;

        let res = app
            .put_with_token(
                &routes::user_password(alice.id),
                &json!({"current_password": "not-it-at-all", "new_password": "a-new-password"}),
                &alice.token,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn cannot_change_someone_elses_password() {
        let app = TestApp::spawn().await;
        let alice = app.create_authenticated_user("alice").await;
        let mallory = app.create_authenticated_user("mallory").await;

        let res = app
            .put_with_token(
                &routes::user_password(alice.id),
                &json!({"current_password": PASSWORD, "new_password": "a-new-password"}),
                &mallory.token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
