// Wire protocol DTOs and conversions for the public game socket.
// The domain never sees these types; conversions happen at the adapter edge.

use crate::domain::state::{
    ConstructSnapshot, LeaderboardEntry, PlayerSnapshot, PraesidiumSnapshot, ProjectileSnapshot,
};
use crate::domain::{BuildRequest, ConstructKind, KeyboardState, PlayerInput, Snapshot};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { client_id: u64 },
    // Per-observer view of the world for one tick.
    Snapshot(SnapshotDto),
    Chat(ChatDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake; must be the first message on the socket.
    Join(JoinPayload),
    Input(InputDto),
    Chat(ChatPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub message: String,
}

/// One input frame, field names as the browser client sends them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDto {
    #[serde(default)]
    pub keyboard_state: KeyboardDto,
    #[serde(default)]
    pub orientation: f64,
    #[serde(default)]
    pub shot: bool,
    #[serde(default)]
    pub build: Option<BuildDto>,
    // Client wall clock in ms; may arrive as a float.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct KeyboardDto {
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
}

impl From<InputDto> for PlayerInput {
    fn from(input: InputDto) -> Self {
        let keys = input.keyboard_state;
        Self {
            keyboard: KeyboardState {
                up: keys.up,
                down: keys.down,
                left: keys.left,
                right: keys.right,
            },
            orientation: input.orientation,
            shoot: input.shot,
            // An unknown construct type drops the build, not the whole frame.
            build: input.build.and_then(|build| {
                ConstructKind::from_name(&build.kind).map(|kind| BuildRequest {
                    kind,
                    x: build.x,
                    y: build.y,
                })
            }),
            timestamp: input
                .timestamp
                // The world estimates latency in signed milliseconds.
                .filter(|ts| ts.is_finite() && *ts >= 0.0 && *ts < i64::MAX as f64)
                .map(|ts| ts as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatDto {
    pub name: String,
    pub message: String,
    pub is_notification: bool,
}

/// Snapshot sent to one client on each tick.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub leaderboard: Vec<LeaderboardEntryDto>,
    #[serde(rename = "self")]
    pub own: PlayerStateDto,
    pub players: Vec<PlayerStateDto>,
    pub projectiles: Vec<ProjectileStateDto>,
    pub constructs: Vec<ConstructStateDto>,
    pub praesidia: Vec<PraesidiumStateDto>,
    pub latency: i64,
}

impl From<Snapshot> for SnapshotDto {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            leaderboard: snapshot
                .leaderboard
                .iter()
                .map(LeaderboardEntryDto::from)
                .collect(),
            own: PlayerStateDto::from(&snapshot.own),
            players: snapshot.players.iter().map(PlayerStateDto::from).collect(),
            projectiles: snapshot
                .projectiles
                .iter()
                .map(ProjectileStateDto::from)
                .collect(),
            constructs: snapshot
                .constructs
                .iter()
                .map(ConstructStateDto::from)
                .collect(),
            praesidia: snapshot
                .praesidia
                .iter()
                .map(PraesidiumStateDto::from)
                .collect(),
            latency: snapshot.latency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntryDto {
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
}

impl From<&LeaderboardEntry> for LeaderboardEntryDto {
    fn from(entry: &LeaderboardEntry) -> Self {
        Self {
            name: entry.name.clone(),
            kills: entry.kills,
            deaths: entry.deaths,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStateDto {
    pub id: u64,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
    pub health: i32,
    pub max_health: i32,
    pub praesidia: u32,
    pub kills: u32,
    pub deaths: u32,
    pub last_shot: Option<u64>,
    pub shot_cooldown: u64,
}

impl From<&PlayerSnapshot> for PlayerStateDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            id: player.id.0,
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            orientation: player.orientation,
            health: player.health,
            max_health: player.max_health,
            praesidia: player.praesidia,
            kills: player.kills,
            deaths: player.deaths,
            last_shot: player.last_shot,
            shot_cooldown: player.shot_cooldown,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectileStateDto {
    pub id: u64,
    pub owner_id: u64,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
}

impl From<&ProjectileSnapshot> for ProjectileStateDto {
    fn from(projectile: &ProjectileSnapshot) -> Self {
        Self {
            id: projectile.id.0,
            owner_id: projectile.owner.0,
            x: projectile.x,
            y: projectile.y,
            orientation: projectile.orientation,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstructStateDto {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub owner_id: u64,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
    pub health: i32,
}

impl From<&ConstructSnapshot> for ConstructStateDto {
    fn from(construct: &ConstructSnapshot) -> Self {
        Self {
            id: construct.id.0,
            kind: construct.kind.name(),
            owner_id: construct.owner.0,
            x: construct.x,
            y: construct.y,
            orientation: construct.orientation,
            health: construct.health,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PraesidiumStateDto {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub quantity: u32,
}

impl From<&PraesidiumSnapshot> for PraesidiumStateDto {
    fn from(pallet: &PraesidiumSnapshot) -> Self {
        Self {
            id: pallet.id.0,
            x: pallet.x,
            y: pallet.y,
            quantity: pallet.quantity,
        }
    }
}
