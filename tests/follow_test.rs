mod common;

use microblog::services::follow::FollowService;
use microblog::AppError;

#[tokio::test]
async fn follow_is_idempotent() {
    let db = common::setup_db().await;
    let service = FollowService::new(db.clone());
    let john = common::create_user(&db, "john").await;
    let susan = common::create_user(&db, "susan").await;

    assert!(!service.is_following(john.id, susan.id).await.unwrap());

    assert!(service.follow(john.id, susan.id).await.unwrap());
    assert!(!service.follow(john.id, susan.id).await.unwrap());
    assert!(service.is_following(john.id, susan.id).await.unwrap());
    assert!(!service.is_following(susan.id, john.id).await.unwrap());

    assert_eq!(service.following_count(john.id).await.unwrap(), 1);
    assert_eq!(service.followers_count(susan.id).await.unwrap(), 1);
    assert_eq!(service.followers_count(john.id).await.unwrap(), 0);

    assert!(service.unfollow(john.id, susan.id).await.unwrap());
    assert!(!service.unfollow(john.id, susan.id).await.unwrap());
    assert!(!service.is_following(john.id, susan.id).await.unwrap());
    assert_eq!(service.following_count(john.id).await.unwrap(), 0);
    assert_eq!(service.followers_count(susan.id).await.unwrap(), 0);
}

#[tokio::test]
async fn cannot_follow_self() {
    let db = common::setup_db().await;
    let user = common::create_user(&db, "narcissus").await;

    let err = FollowService::new(db)
        .follow(user.id, user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn follow_and_unfollow_over_http() {
    let app = common::spawn_app().await;
    let me = common::logged_in_user(&app, "fan").await;
    let star = common::create_user(&app.db, "star").await;

    let resp = app
        .client
        .post(app.url(&format!("/follow/{}", star.username)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), format!("/user/{}", star.username));

    let resp = app
        .client
        .get(app.url(&format!("/user/{}", star.username)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains(&format!("You are following {}!", star.username)));
    assert!(body.contains("1 followers, 0 following."));
    assert!(body.contains("Unfollow"));

    let service = FollowService::new(app.db.clone());
    assert!(service.is_following(me.id, star.id).await.unwrap());

    let resp = app
        .client
        .post(app.url(&format!("/unfollow/{}", star.username)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert!(!service.is_following(me.id, star.id).await.unwrap());
}

#[tokio::test]
async fn follow_refusals_redirect_with_message() {
    let app = common::spawn_app().await;
    let me = common::logged_in_user(&app, "lonely").await;

    let resp = app
        .client
        .post(app.url("/follow/ghost_user"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(common::location(&resp), "/index");

    let resp = app.client.get(app.url("/index")).send().await.unwrap();
    let body = resp.text().await.unwrap();
    assert!(body.contains("User ghost_user not found."));

    let resp = app
        .client
        .post(app.url(&format!("/follow/{}", me.username)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(
        FollowService::new(app.db.clone())
            .following_count(me.id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn follow_requires_login() {
    let app = common::spawn_app().await;
    let star = common::create_user(&app.db, "popular").await;

    let resp = app
        .client
        .post(app.url(&format!("/follow/{}", star.username)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 302);
    assert!(common::location(&resp).starts_with("/login?next="));
}
