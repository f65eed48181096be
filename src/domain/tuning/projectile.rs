use serde::Deserialize;

/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Travel speed in pixels per millisecond.
    pub speed: f64,

    /// Distance in pixels after which the projectile is despawned.
    pub max_travel: f64,

    /// World-space collision radius in pixels.
    pub radius: f64,

    pub damage: i32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 0.85,
            max_travel: 1000.0,
            radius: 4.0,
            damage: 1,
        }
    }
}
