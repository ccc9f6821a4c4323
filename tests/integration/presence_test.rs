//! Integration tests for multi-device presence.

use parlor_entity::PresenceStatus;
use parlor_store::UserDirectory;

use crate::helpers::TestApp;

#[tokio::test(start_paused = true)]
async fn test_presence_follows_last_connection() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (_bob, bob_token) = app.create_user("bob", "Bob").await;

    let mut observer = app.open_session(&bob_token).await;
    let first = app.open_session(&ada_token).await;
    let second = app.open_session(&ada_token).await;
    assert_eq!(app.engine().registry.user_connections(ada.id).len(), 2);

    // Only the 0 -> 1 transition is announced.
    let updates = observer.drain_type("presence:updated");
    let ada_updates: Vec<_> = updates
        .iter()
        .filter(|e| e["user"]["id"] == serde_json::json!(ada.id))
        .collect();
    assert_eq!(ada_updates.len(), 1);
    assert_eq!(ada_updates[0]["user"]["presenceStatus"], "online");

    first.close().await;
    let user = app.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(user.presence_status, PresenceStatus::Online);
    assert!(observer.drain_type("presence:updated").is_empty());

    second.close().await;
    let user = app.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(user.presence_status, PresenceStatus::Offline);
    assert!(user.last_seen_at.is_some());

    let updates = observer.drain_type("presence:updated");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["user"]["presenceStatus"], "offline");
}

#[tokio::test(start_paused = true)]
async fn test_sticky_status_survives_reconnect() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;

    let session = app.open_session(&ada_token).await;
    let response = app
        .request(
            "PUT",
            "/api/users/me/presence",
            Some(serde_json::json!({ "status": "dnd" })),
            Some(&ada_token),
        )
        .await;
    assert_eq!(response.status, http::StatusCode::OK);
    assert_eq!(response.body["user"]["presenceStatus"], "dnd");

    session.close().await;
    let _again = app.open_session(&ada_token).await;
    let user = app.store.find_user(ada.id).await.unwrap().unwrap();
    assert_eq!(user.presence_status, PresenceStatus::Dnd);
}
