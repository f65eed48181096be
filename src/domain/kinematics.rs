// Shared position/velocity state embedded by every world object.
//
// Velocities are in pixels per millisecond and timestamps are logical
// milliseconds supplied by the tick, so integration never reads a clock.

use crate::domain::errors::EntityFault;
use crate::domain::tuning::WorldTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct Kinematics {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Radians, 0 = up on screen, increasing clockwise.
    pub orientation: f64,
    /// Radius of the circular hitbox centered on (x, y).
    pub hitbox: f64,
    last_update: Option<u64>,
}

impl Kinematics {
    pub fn at(x: f64, y: f64, orientation: f64, hitbox: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            orientation,
            hitbox,
            last_update: None,
        }
    }

    pub fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }

    /// Advances the position by velocity times the time since the previous call and
    /// returns that elapsed time. The first call after creation uses a zero delta.
    pub fn integrate(&mut self, now: u64) -> f64 {
        let elapsed = match self.last_update {
            Some(last) => now.saturating_sub(last) as f64,
            None => 0.0,
        };
        self.x += self.vx * elapsed;
        self.y += self.vy * elapsed;
        self.last_update = Some(now);
        elapsed
    }

    pub fn last_update(&self) -> Option<u64> {
        self.last_update
    }

    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    pub fn distance_sq_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }

    /// Strict overlap of the two circular hitboxes.
    pub fn collides_with(&self, other: &Kinematics) -> bool {
        let reach = self.hitbox + other.hitbox;
        self.distance_sq_to(other.x, other.y) < reach * reach
    }

    /// True when this position lies inside the observer's visibility window (edges included).
    pub fn is_visible_to(&self, observer: &Kinematics, world: &WorldTuning) -> bool {
        (self.x - observer.x).abs() <= world.visibility_x
            && (self.y - observer.y).abs() <= world.visibility_y
    }

    pub fn clamp_to(&mut self, world: &WorldTuning) {
        self.x = world.clamp(self.x);
        self.y = world.clamp(self.y);
    }

    pub fn teleport(&mut self, (x, y): (f64, f64)) {
        self.x = x;
        self.y = y;
    }

    pub fn ensure_finite(&self) -> Result<(), EntityFault> {
        for (field, value) in [
            ("x", self.x),
            ("y", self.y),
            ("vx", self.vx),
            ("vy", self.vy),
            ("orientation", self.orientation),
        ] {
            if !value.is_finite() {
                return Err(EntityFault::NonFinite { field, value });
            }
        }
        Ok(())
    }
}

/// Anything that embeds a [`Kinematics`] gets the shared geometry for free.
pub trait Body {
    fn body(&self) -> &Kinematics;

    fn collides_with(&self, other: &impl Body) -> bool {
        self.body().collides_with(other.body())
    }

    fn is_visible_to(&self, observer: &impl Body, world: &WorldTuning) -> bool {
        self.body().is_visible_to(observer.body(), world)
    }
}

impl Body for Kinematics {
    fn body(&self) -> &Kinematics {
        self
    }
}
