use rand::Rng;
use serde::Deserialize;

/// World geometry shared by the server and any client-side renderer.
///
/// The world is always a square, so a single min/max pair covers both axes.
/// All values are in pixels.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    pub min: f64,
    pub max: f64,

    /// Margin kept free of random spawns along every edge.
    pub padding: f64,

    /// Half-width of the visibility window around an observer
    /// (half the viewport width plus a small margin).
    pub visibility_x: f64,

    /// Half-height of the visibility window around an observer.
    pub visibility_y: f64,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 2500.0,
            padding: 30.0,
            // 800x600 viewport.
            visibility_x: 800.0 / 2.0 + 25.0,
            visibility_y: 600.0 / 2.0 + 25.0,
        }
    }
}

impl WorldTuning {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min..=self.max).contains(&x) && (self.min..=self.max).contains(&y)
    }

    /// Uniformly random point inside the padded world.
    pub fn random_point(&self, rng: &mut impl Rng) -> (f64, f64) {
        let low = self.min + self.padding;
        let high = self.max - self.padding;
        if low >= high {
            let mid = (self.min + self.max) / 2.0;
            return (mid, mid);
        }
        (rng.random_range(low..high), rng.random_range(low..high))
    }
}
