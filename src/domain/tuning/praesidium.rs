use serde::Deserialize;

/// Gameplay tuning for praesidium pallets (ambient spawns and death bursts).

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PraesidiumTuning {
    /// World-space collision radius in pixels.
    pub radius: f64,

    /// Number of pallets the world keeps on the field at all times.
    pub minimum_count: usize,

    /// Inclusive quantity range for ambient pallets.
    pub ambient_min_quantity: u32,
    pub ambient_max_quantity: u32,

    /// Largest quantity a single burst pallet carries.
    pub burst_pallet_quantity: u32,

    /// Launch speed range for burst pallets, pixels per millisecond.
    pub burst_min_speed: f64,
    pub burst_max_speed: f64,

    /// Linear deceleration of burst pallets, pixels per millisecond squared.
    pub burst_deceleration: f64,
}

impl Default for PraesidiumTuning {
    fn default() -> Self {
        Self {
            radius: 10.0,
            minimum_count: 40,
            ambient_min_quantity: 1,
            ambient_max_quantity: 10,
            burst_pallet_quantity: 5,
            burst_min_speed: 0.15,
            burst_max_speed: 0.35,
            burst_deceleration: 0.0005,
        }
    }
}
