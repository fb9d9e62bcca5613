//! End-to-end tests using a real WebSocket client and real HTTP requests.

use std::time::Duration;

use courier_server::config::ServerConfig;
use courier_server::server::CourierServer;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Boot a test server on an auto-assigned port.
async fn boot_server() -> (String, String, CourierServer) {
    let server = CourierServer::new(ServerConfig::default(), None);
    let (addr, _handle) = server.listen().await.unwrap();
    (format!("http://{addr}"), format!("ws://{addr}/ws"), server)
}

/// Next JSON text frame, skipping ping/pong.
async fn recv_event(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .unwrap();
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Connect a client and consume the `connection.established` hello.
async fn connect_client(ws_url: &str) -> WsStream {
    let (mut ws, _) = connect_async(ws_url).await.unwrap();
    let hello = recv_event(&mut ws).await;
    assert_eq!(hello["type"], "connection.established");
    assert!(hello["data"]["connectionId"].is_string());
    ws
}

async fn register(ws: &mut WsStream, user: &str) {
    let frame = json!({"type": "register", "userId": user}).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

/// Poll `/health` until the expected number of users is registered.
async fn wait_for_registered(base: &str, expected: usize) {
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    loop {
        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if health["registered_users"] == json!(expected) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "registration did not land: {health}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn send_notification(base: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/notifications/send"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn fetch_history(base: &str, user: &str) -> Vec<Value> {
    reqwest::Client::new()
        .get(format!("{base}/notifications/{user}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn specific_send_reaches_registered_client() {
    let (base, ws_url, _server) = boot_server().await;
    let mut ws = connect_client(&ws_url).await;
    register(&mut ws, "alice").await;
    wait_for_registered(&base, 1).await;

    let resp = send_notification(
        &base,
        json!({"target": "specific", "userId": "alice", "message": "Hi"}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    let event = recv_event(&mut ws).await;
    assert_eq!(event["type"], "notification");
    assert_eq!(event["data"]["message"], "Hi");
    assert_eq!(event["data"]["status"], "unread");

    // Stored as well as delivered
    let history = fetch_history(&base, "alice").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["message"], "Hi");
}

#[tokio::test]
async fn offline_send_is_stored_for_later_fetch() {
    let (base, ws_url, _server) = boot_server().await;

    let resp = send_notification(
        &base,
        json!({"target": "specific", "userId": "alice", "message": "Hi"}),
    )
    .await;
    assert_eq!(resp.status(), 200);

    // alice connects afterwards and finds the stored copy, still unread
    let mut ws = connect_client(&ws_url).await;
    register(&mut ws, "alice").await;
    wait_for_registered(&base, 1).await;

    let history = fetch_history(&base, "alice").await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["message"], "Hi");
    assert_eq!(history[0]["status"], "unread");
}

#[tokio::test]
async fn broadcast_fans_out_to_registered_users_only() {
    let (base, ws_url, _server) = boot_server().await;
    let mut alice = connect_client(&ws_url).await;
    let mut bob = connect_client(&ws_url).await;
    let mut lurker = connect_client(&ws_url).await; // never registers
    register(&mut alice, "alice").await;
    register(&mut bob, "bob").await;
    wait_for_registered(&base, 2).await;

    let resp = send_notification(&base, json!({"target": "broadcast", "message": "Everyone"})).await;
    assert_eq!(resp.status(), 200);

    let event_a = recv_event(&mut alice).await;
    let event_b = recv_event(&mut bob).await;
    assert_eq!(event_a["data"]["message"], "Everyone");
    assert_eq!(event_b["data"]["message"], "Everyone");
    assert_eq!(event_a["data"]["target"], "broadcast");

    // The unregistered connection receives nothing
    let quiet = timeout(Duration::from_millis(300), lurker.next()).await;
    assert!(quiet.is_err(), "unregistered connection must not receive a push");

    // Stored for registered users, not for anyone else
    assert_eq!(fetch_history(&base, "alice").await.len(), 1);
    assert_eq!(fetch_history(&base, "bob").await.len(), 1);
    assert!(fetch_history(&base, "carol").await.is_empty());
}

#[tokio::test]
async fn read_marking_via_http() {
    let (base, ws_url, _server) = boot_server().await;
    let mut ws = connect_client(&ws_url).await;
    register(&mut ws, "alice").await;
    wait_for_registered(&base, 1).await;

    let _ = send_notification(
        &base,
        json!({"target": "specific", "userId": "alice", "message": "Hi"}),
    )
    .await;
    let event = recv_event(&mut ws).await;
    let id = event["data"]["id"].as_str().unwrap().to_owned();

    let resp = reqwest::Client::new()
        .post(format!("{base}/notifications/read"))
        .json(&json!({"userId": "alice", "notificationIds": [id]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let history = fetch_history(&base, "alice").await;
    assert_eq!(history[0]["status"], "read");

    // Marking again is harmless
    let resp = reqwest::Client::new()
        .post(format!("{base}/notifications/read"))
        .json(&json!({"userId": "alice", "notificationIds": [history[0]["id"]]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn reregistration_survives_stale_disconnect() {
    let (base, ws_url, _server) = boot_server().await;

    let mut first = connect_client(&ws_url).await;
    register(&mut first, "alice").await;
    wait_for_registered(&base, 1).await;

    // alice reconnects; the new connection takes over the registration
    let mut second = connect_client(&ws_url).await;
    register(&mut second, "alice").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The stale connection closes late; the newer entry must survive
    first.close(None).await.unwrap();
    drop(first);
    wait_for_registered(&base, 1).await;

    let _ = send_notification(
        &base,
        json!({"target": "specific", "userId": "alice", "message": "still here"}),
    )
    .await;
    let event = recv_event(&mut second).await;
    assert_eq!(event["data"]["message"], "still here");
}

#[tokio::test]
async fn invalid_send_is_rejected_with_400() {
    let (base, _ws_url, _server) = boot_server().await;
    let resp = send_notification(&base, json!({"target": "specific", "message": "Hi"})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn disconnect_unregisters_user() {
    let (base, ws_url, _server) = boot_server().await;
    let mut ws = connect_client(&ws_url).await;
    register(&mut ws, "alice").await;
    wait_for_registered(&base, 1).await;

    ws.close(None).await.unwrap();
    drop(ws);
    wait_for_registered(&base, 0).await;
}
