use serde::Deserialize;

use crate::domain::construct::ConstructKind;

/// Per-kind construct table: what it costs, how much it takes to destroy, how often it acts.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct KindTuning {
    /// Praesidia spent to build one.
    pub cost: u32,
    pub max_health: i32,

    /// World-space collision radius in pixels.
    pub radius: f64,

    /// Minimum time between actions (shots, heals) in milliseconds.
    #[serde(default)]
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ConstructTuning {
    pub turret: KindTuning,
    pub wall: KindTuning,
    pub healer: KindTuning,

    /// Maximum distance from the builder at which a construct may be placed.
    pub build_radius: f64,

    /// Turrets only engage targets closer than this.
    pub turret_range: f64,

    /// Healers only heal an owner closer than this.
    pub healer_range: f64,
    pub heal_amount: i32,

    /// Share of the build cost paid back as praesidia when a construct is destroyed.
    pub payout_fraction: f64,
}

impl Default for ConstructTuning {
    fn default() -> Self {
        Self {
            turret: KindTuning {
                cost: 30,
                max_health: 6,
                radius: 10.0,
                cooldown_ms: 500,
            },
            wall: KindTuning {
                cost: 15,
                max_health: 10,
                radius: 16.0,
                cooldown_ms: 0,
            },
            healer: KindTuning {
                cost: 40,
                max_health: 8,
                radius: 10.0,
                cooldown_ms: 1000,
            },
            build_radius: 128.0,
            turret_range: 400.0,
            healer_range: 200.0,
            heal_amount: 1,
            payout_fraction: 0.5,
        }
    }
}

impl ConstructTuning {
    pub fn kind(&self, kind: ConstructKind) -> &KindTuning {
        match kind {
            ConstructKind::Turret => &self.turret,
            ConstructKind::Wall => &self.wall,
            ConstructKind::Healer => &self.healer,
        }
    }

    /// Praesidia paid out when a construct of `kind` is destroyed.
    pub fn payout(&self, kind: ConstructKind) -> u32 {
        let cost = self.kind(kind).cost;
        let share = (f64::from(cost) * self.payout_fraction.clamp(0.0, 1.0)).floor() as u32;
        // Never refund the whole cost.
        share.min(cost.saturating_sub(1))
    }
}
