mod common;

use common::{new_account, spawn_app};
use outcome::ErrorKind;
use shortreel_service::domain::models::AccountPatch;

#[tokio::test]
async fn create_then_get_returns_the_created_record() {
    let app = spawn_app().await;

    let id = app
        .accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();
    assert_eq!(id, "alice");

    let record = app.accounts.get("alice", "hunter2!").await.unwrap();
    assert_eq!(record.account_id, "alice");
    assert_eq!(record.display_name, "User alice");
    assert_eq!(record.email, "alice@example.org");
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let app = spawn_app().await;

    let mut missing_email = new_account("alice", "hunter2!");
    missing_email.email.clear();
    let err = app.accounts.create(missing_email).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let mut missing_password = new_account("alice", "hunter2!");
    missing_password.password.clear();
    let err = app.accounts.create(missing_password).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn duplicate_create_is_a_conflict() {
    let app = spawn_app().await;

    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();
    let err = app
        .accounts
        .create(new_account("alice", "other-pass"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn wrong_password_is_forbidden_cached_or_not() {
    let app = spawn_app().await;
    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();

    // uncached: nothing populated yet
    let err = app.accounts.get("alice", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // populate the cache with a successful read, then hit it with a bad
    // password
    app.accounts.get("alice", "hunter2!").await.unwrap();
    let err = app.accounts.get("alice", "wrong").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn get_unknown_account_is_not_found() {
    let app = spawn_app().await;
    let err = app.accounts.get("ghost", "any").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_is_visible_on_the_next_read() {
    let app = spawn_app().await;
    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();

    // warm the cache so the update has a stale entry to invalidate
    app.accounts.get("alice", "hunter2!").await.unwrap();

    app.accounts
        .update(
            "alice",
            "hunter2!",
            AccountPatch {
                display_name: Some("Alice Prime".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let record = app.accounts.get("alice", "hunter2!").await.unwrap();
    assert_eq!(record.display_name, "Alice Prime");
    assert_eq!(record.email, "alice@example.org");
}

#[tokio::test]
async fn update_can_rotate_the_password() {
    let app = spawn_app().await;
    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();

    app.accounts
        .update(
            "alice",
            "hunter2!",
            AccountPatch {
                password: Some("new-pass!".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = app.accounts.get("alice", "hunter2!").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    app.accounts.get("alice", "new-pass!").await.unwrap();
}

#[tokio::test]
async fn update_rejects_an_id_change() {
    let app = spawn_app().await;
    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();

    let err = app
        .accounts
        .update(
            "alice",
            "hunter2!",
            AccountPatch {
                account_id: Some("mallory".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn search_matches_substrings_case_insensitively_and_strips_credentials() {
    let app = spawn_app().await;
    app.accounts
        .create(new_account("Alice", "hunter2!"))
        .await
        .unwrap();
    app.accounts
        .create(new_account("bob", "hunter2!"))
        .await
        .unwrap();

    let hits = app.accounts.search("ALI").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].account_id, "Alice");

    let encoded = serde_json::to_string(&hits).unwrap();
    assert!(!encoded.contains("password"));
    assert!(!encoded.contains("argon2"));
}

#[tokio::test]
async fn delete_removes_the_account_and_cascades_to_dependents() {
    let mut app = spawn_app().await;
    app.accounts
        .create(new_account("alice", "hunter2!"))
        .await
        .unwrap();
    app.accounts
        .create(new_account("bob", "hunter2!"))
        .await
        .unwrap();

    let p1 = app.posts.create("alice", "hunter2!").await.unwrap();
    let p2 = app.posts.create("alice", "hunter2!").await.unwrap();
    app.blobs
        .write(&p1.post.post_id, b"video-bytes")
        .await
        .unwrap();
    app.posts
        .follow("bob", "alice", true, "hunter2!")
        .await
        .unwrap();
    app.posts
        .follow("alice", "bob", true, "hunter2!")
        .await
        .unwrap();
    app.posts
        .like(&p1.post.post_id, "bob", true, "hunter2!")
        .await
        .unwrap();

    let wrong = app.accounts.delete("alice", "wrong").await.unwrap_err();
    assert_eq!(wrong.kind(), ErrorKind::Forbidden);

    app.accounts.delete("alice", "hunter2!").await.unwrap();

    let err = app.accounts.get("alice", "hunter2!").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // the cascade runs off the caller's path; its report tells us when
    // the dependents are gone
    let report = app.reports.recv().await.expect("cascade report");
    assert_eq!(report.owner_id, "alice");
    assert_eq!(report.outcome.as_ref().unwrap(), &2);

    for post_id in [&p1.post.post_id, &p2.post.post_id] {
        let err = app.posts.get(post_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
    let err = app.blobs.read(&p1.post.post_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // bob's side of the follow edge is gone too
    assert!(app
        .posts
        .followers_of("bob", "hunter2!")
        .await
        .unwrap()
        .is_empty());
}
