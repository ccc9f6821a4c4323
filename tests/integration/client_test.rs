//! Integration tests driving a `ChatClient` against the in-process engine.

use std::time::Duration;

use serde_json::json;

use parlor_client::{ClientNotice, DeliveryStatus, IndicatorKind, LinkState, LocalId};
use parlor_entity::MessageFormat;

use crate::helpers::{TestApp, settle, wait_for_notice};

fn is_ready(notice: &ClientNotice) -> bool {
    matches!(notice, ClientNotice::Ready { .. })
}

#[tokio::test(start_paused = true)]
async fn test_optimistic_send_leaves_one_entry() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;
    let conv = room.id;
    let mut bob_session = app.open_session(&bob_token).await;

    let (client, mut notices) = app.start_client();
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;

    let temp_id = client
        .send_message(conv, "hello", MessageFormat::Text)
        .await
        .unwrap();
    let ClientNotice::MessageConfirmed { message_id, .. } =
        wait_for_notice(&mut notices, |n| matches!(n, ClientNotice::MessageConfirmed { .. })).await
    else {
        unreachable!()
    };
    settle().await;

    let created = bob_session.drain_type("message:created");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["message"]["id"], json!(message_id));

    let (entries, preview) = client
        .inspect(move |s| {
            (
                s.messages(conv).to_vec(),
                s.conversation(conv).and_then(|c| c.last_message.clone()),
            )
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].canonical_id(), Some(message_id));
    assert_eq!(entries[0].status, DeliveryStatus::Delivered);
    assert_ne!(entries[0].id, LocalId::Temp(temp_id));
    assert_eq!(preview.as_deref(), Some("hello"));
}

#[tokio::test(start_paused = true)]
async fn test_send_to_foreign_conversation_fails_visibly() {
    let app = TestApp::new();
    let (_ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, _) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&bob]).await;
    let conv = room.id;

    let (client, mut notices) = app.start_client();
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;

    client
        .send_message(conv, "let me in", MessageFormat::Text)
        .await
        .unwrap();
    let notice =
        wait_for_notice(&mut notices, |n| matches!(n, ClientNotice::MessageFailed { .. })).await;
    let ClientNotice::MessageFailed { error, .. } = notice else {
        unreachable!()
    };
    assert_eq!(error, "Conversation not found");

    let entry = client
        .inspect(move |s| s.messages(conv)[0].clone())
        .await
        .unwrap();
    assert_eq!(entry.status, DeliveryStatus::Failed);
    assert!(app.store.history(conv).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_remote_typing_clears_after_ttl() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;
    let conv = room.id;
    let bob_session = app.open_session(&bob_token).await;

    let (client, mut notices) = app.start_client();
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;

    bob_session
        .send(json!({ "type": "typing", "conversationId": conv, "typing": true }))
        .await;
    settle().await;
    let line = client
        .inspect(move |s| s.indicator(conv, IndicatorKind::Typing))
        .await
        .unwrap();
    assert_eq!(line.as_deref(), Some("Bob is typing…"));

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;
    assert_eq!(client.inspect(|s| s.active_signals()).await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_clears_signals_and_keeps_one_connection() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;
    let (bob, bob_token) = app.create_user("bob", "Bob").await;
    let room = app.create_room(&[&ada, &bob]).await;
    let bob_session = app.open_session(&bob_token).await;

    let (client, mut notices) = app.start_client();
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;

    bob_session
        .send(json!({ "type": "thinking", "conversationId": room.id, "thinking": true }))
        .await;
    settle().await;
    assert_eq!(client.inspect(|s| s.active_signals()).await.unwrap(), 1);

    app.sever_client_channels();
    wait_for_notice(&mut notices, |n| {
        matches!(n, ClientNotice::Disconnected { code: Some(1006), .. })
    })
    .await;
    assert_eq!(client.link_state().await.unwrap(), LinkState::Reconnecting);
    assert_eq!(client.inspect(|s| s.active_signals()).await.unwrap(), 0);
    assert!(app.engine().registry.user_connections(ada.id).is_empty());

    // Bob is still thinking server side; the snapshot does not replay it.
    wait_for_notice(&mut notices, is_ready).await;
    settle().await;
    assert_eq!(client.link_state().await.unwrap(), LinkState::Connected);
    assert_eq!(client.inspect(|s| s.active_signals()).await.unwrap(), 0);
    assert_eq!(app.engine().registry.user_connections(ada.id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_relogin_replaces_connection() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;

    let (client, mut notices) = app.start_client();
    client.login(ada_token.clone());
    wait_for_notice(&mut notices, is_ready).await;
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;
    settle().await;

    assert_eq!(app.engine().registry.user_connections(ada.id).len(), 1);
    assert_eq!(app.engine().connections.connection_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_stops_reconnecting() {
    let app = TestApp::new();
    let (ada, ada_token) = app.create_user("ada", "Ada").await;

    let (client, mut notices) = app.start_client();
    client.login(ada_token);
    wait_for_notice(&mut notices, is_ready).await;

    app.sever_client_channels();
    wait_for_notice(&mut notices, |n| matches!(n, ClientNotice::Disconnected { .. })).await;
    client.logout();
    wait_for_notice(&mut notices, |n| *n == ClientNotice::LoggedOut).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.link_state().await.unwrap(), LinkState::Offline);
    assert!(app.engine().registry.user_connections(ada.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_token_is_reported() {
    let app = TestApp::new();

    let (client, mut notices) = app.start_client();
    client.login("not-a-token");
    let notice =
        wait_for_notice(&mut notices, |n| matches!(n, ClientNotice::HandshakeRejected { .. })).await;
    assert_eq!(
        notice,
        ClientNotice::HandshakeRejected {
            reason: "Invalid token".into()
        }
    );
    assert_eq!(app.engine().connections.connection_count(), 0);
    client.logout();
}
