mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READ_TIMEOUT: Duration = Duration::from_secs(3);

async fn connect() -> Socket {
    let (socket, _response) = connect_async(support::ensure_server())
        .await
        .expect("websocket connect");
    socket
}

async fn send_json(socket: &mut Socket, value: Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send message");
}

/// Next JSON text message, or None once the server closes the socket.
async fn next_json(socket: &mut Socket) -> Option<Value> {
    loop {
        let frame = timeout(READ_TIMEOUT, socket.next())
            .await
            .expect("server message within timeout");
        match frame {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(text.as_str()).expect("server sends json"));
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => {}
        }
    }
}

async fn next_of_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let msg = next_json(socket).await.expect("socket still open");
        if msg["type"] == kind {
            return msg["data"].clone();
        }
    }
}

async fn join(socket: &mut Socket, name: &str) -> u64 {
    send_json(socket, json!({"type": "Join", "data": {"name": name}})).await;
    let identity = next_of_type(socket, "Identity").await;
    identity["client_id"].as_u64().expect("numeric client id")
}

#[tokio::test]
async fn join_then_identity_then_snapshot_of_self() {
    let mut socket = connect().await;

    let client_id = join(&mut socket, "Tester").await;
    let snapshot = next_of_type(&mut socket, "Snapshot").await;

    assert_eq!(snapshot["self"]["id"], client_id);
    assert_eq!(snapshot["self"]["name"], "Tester");
    assert_eq!(snapshot["self"]["health"], 10);
    assert_eq!(snapshot["self"]["praesidia"], 0);
    assert!(snapshot["leaderboard"].as_array().is_some_and(|l| !l.is_empty()));
    assert!(
        snapshot["players"]
            .as_array()
            .is_some_and(|players| players.iter().all(|p| p["id"] != client_id))
    );
}

#[tokio::test]
async fn joining_client_is_welcomed() {
    let mut socket = connect().await;

    join(&mut socket, "Greeter").await;
    let welcome = loop {
        let chat = next_of_type(&mut socket, "Chat").await;
        if chat["message"].as_str().is_some_and(|m| m.starts_with("Welcome Greeter")) {
            break chat;
        }
    };

    assert_eq!(welcome["name"], "[Obsidio]");
    assert_eq!(welcome["is_notification"], true);
}

#[tokio::test]
async fn blank_name_becomes_anonymous() {
    let mut socket = connect().await;

    join(&mut socket, "   ").await;
    let snapshot = next_of_type(&mut socket, "Snapshot").await;

    assert_eq!(snapshot["self"]["name"], "Anonymous");
}

#[tokio::test]
async fn build_without_praesidia_is_rejected() {
    let mut socket = connect().await;
    let client_id = join(&mut socket, "Builder").await;
    let snapshot = next_of_type(&mut socket, "Snapshot").await;
    let (x, y) = (
        snapshot["self"]["x"].as_f64().expect("x"),
        snapshot["self"]["y"].as_f64().expect("y"),
    );

    send_json(
        &mut socket,
        json!({"type": "Input", "data": {
            "keyboardState": {"up": false, "down": false, "left": false, "right": false},
            "orientation": 0.0,
            "shot": false,
            "build": {"type": "turret", "x": x + 10.0, "y": y},
            "timestamp": 0
        }}),
    )
    .await;

    for _ in 0..10 {
        let snapshot = next_of_type(&mut socket, "Snapshot").await;
        let constructs = snapshot["constructs"].as_array().expect("constructs array");
        assert!(constructs.iter().all(|c| c["owner_id"] != client_id));
    }
}

#[tokio::test]
async fn chat_is_relayed_with_sender_name() {
    let mut speaker = connect().await;
    let mut listener = connect().await;
    join(&mut speaker, "Speaker").await;
    join(&mut listener, "Listener").await;

    send_json(&mut speaker, json!({"type": "Chat", "data": {"message": "  hello arena  "}})).await;

    let line = loop {
        let chat = next_of_type(&mut listener, "Chat").await;
        if chat["name"] == "Speaker" {
            break chat;
        }
    };
    assert_eq!(line["message"], "hello arena");
    assert_eq!(line["is_notification"], false);
}

#[tokio::test]
async fn input_before_join_closes_the_socket() {
    let mut socket = connect().await;

    send_json(
        &mut socket,
        json!({"type": "Input", "data": {"orientation": 0.0, "shot": true}}),
    )
    .await;

    assert!(next_json(&mut socket).await.is_none());
}

#[tokio::test]
async fn binary_frame_after_join_closes_the_socket() {
    let mut socket = connect().await;
    join(&mut socket, "Binary").await;

    socket
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .expect("send binary");

    // Snapshots may already be queued; the socket must close shortly after.
    let mut closed = false;
    for _ in 0..200 {
        if next_json(&mut socket).await.is_none() {
            closed = true;
            break;
        }
    }
    assert!(closed);
}
