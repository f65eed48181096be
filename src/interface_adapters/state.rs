use crate::use_cases::GameEvent;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc};

#[derive(Clone)]
pub struct AppState {
    // Connection events and inputs flowing from every socket into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Serialized chat lines, shared across all connections.
    pub chat_tx: broadcast::Sender<Utf8Bytes>,
}
