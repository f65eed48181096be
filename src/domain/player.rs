// The tank driven by a connected client.

use std::f64::consts::{FRAC_1_SQRT_2, TAU};

use rand::Rng;
use tracing::debug;

use crate::domain::emission::{BuildOrder, Emissions};
use crate::domain::errors::EntityFault;
use crate::domain::kinematics::{Body, Kinematics};
use crate::domain::praesidium::Praesidium;
use crate::domain::projectile::Projectile;
use crate::domain::state::{ClientId, KeyboardState, PlayerInput};
use crate::domain::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: ClientId,
    pub name: String,
    pub body: Kinematics,

    /// Movement speed in pixels per millisecond.
    pub speed: f64,
    pub shot_cooldown: u64,
    pub last_shot: Option<u64>,

    pub health: i32,
    pub max_health: i32,
    pub praesidia: u32,
    pub kills: u32,
    pub deaths: u32,
}

impl Player {
    /// New player at a random point, facing a random direction, with full health and no praesidia.
    pub fn spawn(id: ClientId, name: String, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        let (x, y) = tuning.world.random_point(rng);
        let orientation = rng.random_range(0.0..TAU);
        Self {
            id,
            name,
            body: Kinematics::at(x, y, orientation, tuning.player.radius),
            speed: tuning.player.speed,
            shot_cooldown: tuning.player.shot_cooldown_ms,
            last_shot: None,
            health: tuning.player.max_health,
            max_health: tuning.player.max_health,
            praesidia: 0,
            kills: 0,
            deaths: 0,
        }
    }

    /// Applies one input frame: steering, aim, an optional shot and an optional build order.
    ///
    /// The build order is forwarded unvalidated; cost and placement are the world's call.
    pub fn apply_input(&mut self, input: &PlayerInput, now: u64, tuning: &Tuning, out: &mut Emissions) {
        let (vx, vy) = self.steer(input.keyboard);
        self.body.vx = vx;
        self.body.vy = vy;
        self.body.orientation = input.orientation;

        if input.shoot && self.can_shoot(now) {
            self.last_shot = Some(now);
            out.projectiles.push(Projectile::fire(
                self.body.x,
                self.body.y,
                self.body.orientation,
                self.id,
                &tuning.projectile,
            ));
        }

        if let Some(request) = input.build {
            out.builds.push(BuildOrder {
                owner: self.id,
                request,
            });
        }
    }

    /// Velocity for the held keys. Opposing keys cancel on their axis and diagonals
    /// are scaled by 1/√2 so every direction moves at the same speed.
    fn steer(&self, keys: KeyboardState) -> (f64, f64) {
        let axis = |negative: bool, positive: bool| match (negative, positive) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        let dx = axis(keys.left, keys.right);
        let dy = axis(keys.up, keys.down);
        let scale = if dx != 0.0 && dy != 0.0 {
            self.speed * FRAC_1_SQRT_2
        } else {
            self.speed
        };
        (dx * scale, dy * scale)
    }

    pub fn can_shoot(&self, now: u64) -> bool {
        match self.last_shot {
            Some(last) => now >= last.saturating_add(self.shot_cooldown),
            None => true,
        }
    }

    /// Moves the player and clamps it into the world.
    pub fn tick(&mut self, now: u64, tuning: &Tuning) -> Result<(), EntityFault> {
        self.body.ensure_finite()?;

        self.body.integrate(now);
        self.body.clamp_to(&tuning.world);
        Ok(())
    }

    /// If health ran out, pays out half the praesidia where the player fell and
    /// respawns it away from `rivals` in place of a separate dead state.
    pub fn settle_death(
        &mut self,
        rivals: &[(f64, f64)],
        tuning: &Tuning,
        rng: &mut impl Rng,
        out: &mut Emissions,
    ) {
        if !self.is_dead() {
            return;
        }
        let dropped = self.praesidia / 2;
        self.praesidia -= dropped;
        out.praesidia.extend(Praesidium::burst(
            self.body.x,
            self.body.y,
            dropped,
            &tuning.praesidium,
            rng,
        ));
        self.respawn(rivals, tuning, rng);
        debug!(player_id = self.id.0, dropped, deaths = self.deaths, "player respawned");
    }

    pub fn respawn(&mut self, rivals: &[(f64, f64)], tuning: &Tuning, rng: &mut impl Rng) {
        self.body.teleport(spawn_point(rivals, tuning, rng));
        self.health = self.max_health;
        self.deaths += 1;
    }

    /// Health may go negative here; `settle_death` resolves it.
    pub fn damage(&mut self, amount: i32) {
        self.health -= amount;
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount.max(0)).min(self.max_health);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn credit(&mut self, quantity: u32) {
        self.praesidia = self.praesidia.saturating_add(quantity);
    }

    /// Deducts `cost` if the player can afford it.
    pub fn spend(&mut self, cost: u32) -> bool {
        match self.praesidia.checked_sub(cost) {
            Some(left) => {
                self.praesidia = left;
                true
            }
            None => false,
        }
    }
}

/// Random world point at least the respawn buffer away from every rival.
/// Falls back to the last point tried once the attempts run out.
pub fn spawn_point(rivals: &[(f64, f64)], tuning: &Tuning, rng: &mut impl Rng) -> (f64, f64) {
    let buffer_sq = tuning.player.respawn_buffer * tuning.player.respawn_buffer;
    let clear = |(x, y): (f64, f64)| {
        rivals
            .iter()
            .all(|&(rx, ry)| (rx - x) * (rx - x) + (ry - y) * (ry - y) >= buffer_sq)
    };

    let mut point = tuning.world.random_point(rng);
    for _ in 1..tuning.player.respawn_attempts {
        if clear(point) {
            break;
        }
        point = tuning.world.random_point(rng);
    }
    point
}

impl Body for Player {
    fn body(&self) -> &Kinematics {
        &self.body
    }
}
