use serde::Deserialize;

/// Gameplay tuning for player-controlled tanks.

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Movement speed in pixels per millisecond.
    pub speed: f64,

    /// Minimum time between shots in milliseconds.
    pub shot_cooldown_ms: u64,

    /// World-space collision radius in pixels.
    pub radius: f64,

    pub max_health: i32,

    /// Respawn points closer than this to another player are resampled.
    pub respawn_buffer: f64,

    /// Samples tried before settling for a point inside the buffer.
    pub respawn_attempts: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 0.3,
            shot_cooldown_ms: 800,
            radius: 24.0,
            max_health: 10,
            respawn_buffer: 1000.0,
            respawn_attempts: 15,
        }
    }
}
