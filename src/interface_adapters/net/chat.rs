// Chat relay: display names, message hygiene and server notifications.
// The simulation never sees chat; lines are serialized once and broadcast as shared bytes.

use crate::interface_adapters::protocol::{ChatDto, ServerMessage};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::broadcast;
use tracing::error;

pub const SERVER_TAG: &str = "[Obsidio]";
pub const DEFAULT_NAME: &str = "Anonymous";
const MAX_NAME_CHARS: usize = 32;
const MAX_MESSAGE_CHARS: usize = 200;

pub fn display_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
    if name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        name
    }
}

/// Trimmed and length-capped message, or None if nothing is left to relay.
pub fn clean_message(raw: &str) -> Option<String> {
    let message: String = raw.trim().chars().take(MAX_MESSAGE_CHARS).collect();
    (!message.is_empty()).then_some(message)
}

pub fn notification(message: String) -> ChatDto {
    ChatDto {
        name: SERVER_TAG.to_string(),
        message,
        is_notification: true,
    }
}

pub fn joined(name: &str) -> ChatDto {
    notification(format!("{name} has joined the game."))
}

pub fn left(name: &str) -> ChatDto {
    notification(format!("{name} has left the game."))
}

pub fn welcome(name: &str) -> ChatDto {
    notification(format!(
        "Welcome {name}. Use WASD to move and click to shoot! Move around to acquire \
         praesidia and use it to build turrets and other fortifications. Good luck!"
    ))
}

pub fn encode(line: ChatDto) -> Option<Utf8Bytes> {
    match serde_json::to_string(&ServerMessage::Chat(line)) {
        Ok(txt) => Some(Utf8Bytes::from(txt)),
        Err(e) => {
            error!(error = ?e, "failed to serialize chat line");
            None
        }
    }
}

/// Sends one line to every connected client.
pub fn publish(chat_tx: &broadcast::Sender<Utf8Bytes>, line: ChatDto) {
    if let Some(bytes) = encode(line) {
        // No receivers just means nobody is connected.
        let _ = chat_tx.send(bytes);
    }
}
