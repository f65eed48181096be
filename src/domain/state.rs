// Domain-level identifiers, input intents and per-observer snapshot types.

use crate::domain::construct::{Construct, ConstructKind};
use crate::domain::player::Player;
use crate::domain::praesidium::Praesidium;
use crate::domain::projectile::Projectile;

/// Opaque identifier of a connected client and of the player it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Stable identifier of a registered construct, projectile or pallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildRequest {
    pub kind: ConstructKind,
    pub x: f64,
    pub y: f64,
}

/// One input frame from a client.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInput {
    pub keyboard: KeyboardState,
    pub orientation: f64,
    pub shoot: bool,
    pub build: Option<BuildRequest>,
    // Client clock, only used for the latency estimate.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: ClientId,
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

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: EntityId,
    pub owner: ClientId,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructSnapshot {
    pub id: EntityId,
    pub kind: ConstructKind,
    pub owner: ClientId,
    pub x: f64,
    pub y: f64,
    pub orientation: f64,
    pub health: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PraesidiumSnapshot {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub quantity: u32,
}

/// Everything one observer is allowed to see after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub own: PlayerSnapshot,
    pub players: Vec<PlayerSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub constructs: Vec<ConstructSnapshot>,
    pub praesidia: Vec<PraesidiumSnapshot>,
    pub latency: i64,
}

impl From<&Player> for LeaderboardEntry {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name.clone(),
            kills: p.kills,
            deaths: p.deaths,
        }
    }
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            x: p.body.x,
            y: p.body.y,
            orientation: p.body.orientation,
            health: p.health.max(0),
            max_health: p.max_health,
            praesidia: p.praesidia,
            kills: p.kills,
            deaths: p.deaths,
            last_shot: p.last_shot,
            shot_cooldown: p.shot_cooldown,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner: p.owner,
            x: p.body.x,
            y: p.body.y,
            orientation: p.body.orientation,
        }
    }
}

impl From<&Construct> for ConstructSnapshot {
    fn from(c: &Construct) -> Self {
        Self {
            id: c.id,
            kind: c.kind,
            owner: c.owner,
            x: c.body.x,
            y: c.body.y,
            orientation: c.body.orientation,
            health: c.health.max(0),
        }
    }
}

impl From<&Praesidium> for PraesidiumSnapshot {
    fn from(p: &Praesidium) -> Self {
        Self {
            id: p.id,
            x: p.body.x,
            y: p.body.y,
            quantity: p.quantity,
        }
    }
}
