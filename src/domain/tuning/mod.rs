// Gameplay tuning tables shared by every simulation rule.
//
// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
// Every table deserializes with defaults so a partial TOML file only overrides what it names.

pub mod construct;
pub mod player;
pub mod praesidium;
pub mod projectile;
pub mod world;

pub use construct::{ConstructTuning, KindTuning};
pub use player::PlayerTuning;
pub use praesidium::PraesidiumTuning;
pub use projectile::ProjectileTuning;
pub use world::WorldTuning;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub world: WorldTuning,
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
    pub construct: ConstructTuning,
    pub praesidium: PraesidiumTuning,
    pub snapshot: SnapshotTuning,
}

/// Shape of the per-observer snapshot.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SnapshotTuning {
    /// Number of players listed on the leaderboard.
    pub leaderboard_size: usize,
}

impl Default for SnapshotTuning {
    fn default() -> Self {
        Self {
            leaderboard_size: 10,
        }
    }
}
