// Use-case level inputs for the world task.

use tokio::sync::mpsc;

use crate::domain::{ClientId, PlayerInput, Snapshot};

/// Connection lifecycle and input events, marshalled from every socket into the world task.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        client_id: ClientId,
        name: String,
        // Per-client snapshot delivery; the world task owns the sending half.
        snapshot_tx: mpsc::Sender<Snapshot>,
    },
    Leave {
        client_id: ClientId,
    },
    Input {
        client_id: ClientId,
        input: PlayerInput,
    },
}
