//! Integration tests for fan-out and ephemeral signals over raw sessions.

use std::time::Duration;

use http::StatusCode;
use serde_json::json;

use crate::helpers::{TestApp, settle};

#[tokio::test(start_paused = true)]
async fn test_message_reaches_each_connection_once() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let (dee, dee_token) = app.create_user("dee", "Dee").await;
    let (_eve, eve_token) = app.create_user("eve", "Eve").await;
    let room = app.create_room(&[&ada, &bob, &dee]).await;

    let mut sessions = vec![
        app.open_session(&ada_token).await,
        app.open_session(&bob_token).await,
        app.open_session(&dee_token).await,
        app.open_session(&dee_token).await,
    ];
    let mut outsider = app.open_session(&eve_token).await;

    let response = app
        .request(
            "POST",
            &format!("/api/conversations/{}/messages", room.id),
            Some(json!({ "content": "hello" })),
            Some(&ada_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.body["message"]["id"].clone();

    for session in &mut sessions {
        let created = session.drain_type("message:created");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0]["message"]["id"], id);
    }
    assert!(outsider.drain_type("message:created").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ws_send_acks_after_fanout() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;

    let mut sender = app.open_session(&ada_token).await;
    let mut receiver = app.open_session(&bob_token).await;
    sender.drain();
    receiver.drain();

    sender
        .send(json!({
            "type": "message:send",
            "conversationId": room.id,
            "content": "  hi there  ",
            "clientId": "local-1",
        }))
        .await;

    let frames = sender.drain();
    let types: Vec<_> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["message:created", "message:ack"]);
    assert_eq!(frames[1]["clientId"], "local-1");
    assert_eq!(frames[1]["message"]["content"], "hi there");
    assert_eq!(frames[0]["message"]["id"], frames[1]["message"]["id"]);
    assert_eq!(receiver.drain_type("message:created").len(), 1);
    assert_eq!(app.store.history(room.id).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_events_keep_channel_open() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let room = app.create_room(&[&ada]).await;
    let mut session = app.open_session(&ada_token).await;
    session.drain();

    session.send(json!({ "type": "shout" })).await;
    session
        .send(json!({ "type": "message:send", "conversationId": room.id, "content": "x", "format": "html" }))
        .await;
    session
        .send(json!({ "type": "typing", "typing": true }))
        .await;
    session
        .send(json!({ "type": "message:send", "conversationId": parlor_core::types::ConversationId::new(), "content": "x" }))
        .await;
    session.send(json!({ "type": "ping" })).await;

    let frames = session.drain();
    let errors: Vec<_> = frames
        .iter()
        .filter(|f| f["type"] == "error")
        .map(|f| f["error"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        errors,
        [
            "Unknown event",
            "Invalid format",
            "Invalid typing payload",
            "Conversation not found"
        ]
    );
    assert_eq!(frames.last().unwrap()["type"], "pong");
    assert!(app.store.history(room.id).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_typing_expires_without_stop() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;

    let mut watcher = app.open_session(&ada_token).await;
    let typist = app.open_session(&bob_token).await;
    watcher.drain();

    typist
        .send(json!({ "type": "typing", "conversationId": room.id, "typing": true }))
        .await;
    let started = watcher.drain_type("typing");
    assert_eq!(started.len(), 1);
    assert_eq!(started[0]["typing"], true);
    assert_eq!(started[0]["displayName"], "Bob");

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    let stopped = watcher.drain_type("typing");
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0]["typing"], false);
    assert_eq!(app.engine().signals.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_departure_clears_signals() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;

    let mut watcher = app.open_session(&ada_token).await;
    let typist = app.open_session(&bob_token).await;
    typist
        .send(json!({ "type": "thinking", "conversationId": room.id, "thinking": true }))
        .await;
    watcher.drain();

    typist.close().await;
    let stopped = watcher.drain_type("thinking");
    assert_eq!(stopped.len(), 1);
    assert_eq!(stopped[0]["thinking"], false);
    assert_eq!(app.engine().signals.active_count(), 0);
}
