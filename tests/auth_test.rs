mod common;

use microblog::services::auth::AuthService;
use microblog::AppError;

#[tokio::test]
async fn register_then_login() {
    let app = common::spawn_app().await;
    let username = common::unique_username("susan");

    let resp = common::register(
        &app.client,
        &app,
        &username,
        &format!("{username}@example.com"),
    )
    .await;
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/login");

    let page = app.client.get(app.url("/login")).send().await.unwrap();
    let body = page.text().await.unwrap();
    assert!(body.contains("Congratulations, you are now a registered user!"));

    let resp = common::login(&app.client, &app, &username, common::PASSWORD).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/index");

    let resp = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains(&format!("Hi, {username}!")));
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let app = common::spawn_app().await;
    let username = common::unique_username("dup");

    let resp = common::register(&app.client, &app, &username, "first@example.com").await;
    assert_eq!(resp.status(), 302);

    let resp = common::register(&app.client, &app, &username, "second@example.com").await;
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Please use a different username."));
}

#[tokio::test]
async fn duplicate_email_rejected() {
    let app = common::spawn_app().await;

    let first = common::unique_username("mail");
    let resp = common::register(&app.client, &app, &first, "shared@example.com").await;
    assert_eq!(resp.status(), 302);

    let second = common::unique_username("mail");
    let resp = common::register(&app.client, &app, &second, "shared@example.com").await;
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Please use a different email address."));
}

#[tokio::test]
async fn register_checks_form_fields() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .post(app.url("/register"))
        .form(&[
            ("username", "mismatch"),
            ("email", "not-an-email"),
            ("password", "one"),
            ("password2", "two"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Invalid email address."));
    assert!(body.contains("Field must be equal to password."));
}

#[tokio::test]
async fn service_rejects_duplicates() {
    let db = common::setup_db().await;
    let service = AuthService::new(db.clone());
    let user = common::create_user(&db, "svc").await;

    let err = service
        .register(&user.username, "other@example.com", "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = service
        .register("someone_else", &user.email, "pw")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn wrong_password_is_generic() {
    let app = common::spawn_app().await;
    let user = common::create_user(&app.db, "bob").await;

    for (username, password) in [
        (user.username.as_str(), "wrong"),
        ("no_such_user", common::PASSWORD),
    ] {
        let resp = common::login(&app.client, &app, username, password).await;
        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.contains("Invalid username or password"));
    }

    let resp = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(resp.status(), 302);
}

#[tokio::test]
async fn check_password_matches_only_the_right_one() {
    let db = common::setup_db().await;
    let user = common::create_user(&db, "hash").await;

    assert!(user.check_password(common::PASSWORD).unwrap());
    assert!(!user.check_password("not it").unwrap());
    assert_ne!(user.password_hash, common::PASSWORD);
}

#[tokio::test]
async fn login_honours_local_next_only() {
    let app = common::spawn_app().await;
    let user = common::create_user(&app.db, "nxt").await;

    let resp = app
        .client
        .post(app.url("/login?next=%2Fexplore"))
        .form(&[("username", user.username.as_str()), ("password", common::PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(common::location(&resp), "/explore");

    let other = app.new_client();
    let resp = other
        .post(app.url("/login?next=https%3A%2F%2Fevil.example"))
        .form(&[("username", user.username.as_str()), ("password", common::PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(common::location(&resp), "/index");
}

#[tokio::test]
async fn remember_me_makes_cookie_persistent() {
    let app = common::spawn_app().await;
    let user = common::create_user(&app.db, "rem").await;

    let resp = common::login(&app.new_client(), &app, &user.username, common::PASSWORD).await;
    let cookie = resp.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.starts_with("session="));
    assert!(!cookie.contains("Max-Age"));

    let resp = app
        .new_client()
        .post(app.url("/login"))
        .form(&[
            ("username", user.username.as_str()),
            ("password", common::PASSWORD),
            ("remember_me", "y"),
        ])
        .send()
        .await
        .unwrap();
    let cookie = resp.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(cookie.contains("Max-Age=1209600"));
}

#[tokio::test]
async fn logged_in_users_skip_login_page() {
    let app = common::spawn_app().await;
    common::logged_in_user(&app, "already").await;

    for path in ["/login", "/register", "/reset_password_request"] {
        let resp = app.client.get(app.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 302, "GET {path}");
        assert_eq!(common::location(&resp), "/index");
    }
}

#[tokio::test]
async fn logout_ends_session() {
    let app = common::spawn_app().await;
    common::logged_in_user(&app, "leaver").await;

    let resp = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app.client.get(app.url("/logout")).send().await.unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/index");

    let resp = app.client.get(app.url("/index")).send().await.unwrap();
    assert_eq!(resp.status(), 302);
}

#[tokio::test]
async fn requests_update_last_seen() {
    let app = common::spawn_app().await;
    let user = common::logged_in_user(&app, "seen").await;

    app.client.get(app.url("/index")).send().await.unwrap();

    let reloaded = microblog::services::user::UserService::new(app.db.clone())
        .get_by_id(user.id)
        .await
        .unwrap();
    assert!(reloaded.last_seen >= user.last_seen);
}

#[tokio::test]
async fn reset_token_verifies_until_expiry() {
    let db = common::setup_db().await;
    let service = AuthService::new(db.clone());
    let user = common::create_user(&db, "reset").await;

    let token = service.reset_password_token(&user).unwrap();
    let found = service.verify_reset_password_token(&token).await.unwrap();
    assert_eq!(found.id, user.id);

    let expired = microblog::utils::encode_reset_password_token(&user.username, -5).unwrap();
    assert!(matches!(
        service.verify_reset_password_token(&expired).await,
        Err(AppError::InvalidResetToken)
    ));

    let tampered = format!("{token}x");
    assert!(matches!(
        service.verify_reset_password_token(&tampered).await,
        Err(AppError::InvalidResetToken)
    ));
}

#[tokio::test]
async fn reset_password_flow() {
    let app = common::spawn_app().await;
    let user = common::create_user(&app.db, "forgot").await;
    let token = AuthService::new(app.db.clone())
        .reset_password_token(&user)
        .unwrap();

    let resp = app
        .client
        .post(app.url("/reset_password_request"))
        .form(&[("email", user.email.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/login");

    let path = format!("/reset_password/{token}");
    let resp = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(app.url(&path))
        .form(&[("password", "brand_new_pw"), ("password2", "brand_new_pw")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/login");

    let resp = common::login(&app.client, &app, &user.username, "brand_new_pw").await;
    assert_eq!(resp.status(), 302);
}

#[tokio::test]
async fn bad_reset_link_redirects() {
    let app = common::spawn_app().await;

    let resp = app
        .client
        .get(app.url("/reset_password/garbage"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/index");
}
