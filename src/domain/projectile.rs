// Straight-line shots fired by players and turrets.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use crate::domain::construct::{Construct, ConstructKind};
use crate::domain::errors::EntityFault;
use crate::domain::kinematics::{Body, Kinematics};
use crate::domain::registry::{PlayerRegistry, Tracked};
use crate::domain::state::{ClientId, EntityId};
use crate::domain::tuning::{ProjectileTuning, WorldTuning};

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    /// Player credited for the shot; never damaged by it.
    pub owner: ClientId,
    pub body: Kinematics,
    pub damage: i32,
    pub distance_traveled: f64,
    pub exists: bool,
}

/// What a projectile struck on its final tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Player { victim: ClientId, killed: bool },
    Construct { id: EntityId, kind: ConstructKind },
}

impl Projectile {
    /// Launches a projectile from (x, y). `direction` uses the screen convention
    /// (0 = up, clockwise), so the launch vector is rotated a quarter turn.
    pub fn fire(x: f64, y: f64, direction: f64, owner: ClientId, tuning: &ProjectileTuning) -> Self {
        let heading = direction - FRAC_PI_2;
        let body = Kinematics::at(x, y, direction, tuning.radius)
            .with_velocity(tuning.speed * heading.cos(), tuning.speed * heading.sin());
        Self {
            id: EntityId::default(),
            owner,
            body,
            damage: tuning.damage,
            distance_traveled: 0.0,
            exists: true,
        }
    }

    /// Moves the projectile and resolves at most one hit, players first.
    pub fn tick(
        &mut self,
        now: u64,
        players: &mut PlayerRegistry,
        constructs: &mut [Construct],
        world: &WorldTuning,
        tuning: &ProjectileTuning,
    ) -> Result<Option<Hit>, EntityFault> {
        self.body.ensure_finite()?;

        let elapsed = self.body.integrate(now);
        self.distance_traveled += self.body.speed() * elapsed;
        if self.distance_traveled > tuning.max_travel || !world.contains(self.body.x, self.body.y) {
            self.exists = false;
            return Ok(None);
        }

        if let Some(hit) = self.hit_player(players) {
            return Ok(Some(hit));
        }
        Ok(self.hit_construct(constructs))
    }

    fn hit_player(&mut self, players: &mut PlayerRegistry) -> Option<Hit> {
        let victim = players
            .iter_mut()
            .find(|p| p.id != self.owner && !p.is_dead() && p.collides_with(&self.body))?;

        victim.damage(self.damage);
        let victim_id = victim.id;
        let killed = victim.is_dead();
        let victim_health = victim.health;
        self.exists = false;

        debug!(
            victim_id = victim_id.0,
            shooter_id = self.owner.0,
            projectile_id = self.id.0,
            victim_health,
            "player hit"
        );

        if killed {
            // The shooter may have disconnected while the shot was in flight.
            if let Some(shooter) = players.get_mut(self.owner) {
                shooter.kills += 1;
            }
        }

        Some(Hit::Player {
            victim: victim_id,
            killed,
        })
    }

    fn hit_construct(&mut self, constructs: &mut [Construct]) -> Option<Hit> {
        let owner = self.owner;
        let target = constructs.iter_mut().find(|c| {
            // Walls block everyone's shots, including their owner's.
            c.exists
                && c.health > 0
                && (c.owner != owner || c.kind == ConstructKind::Wall)
                && c.collides_with(&self.body)
        })?;

        target.damage(self.damage);
        self.exists = false;

        Some(Hit::Construct {
            id: target.id,
            kind: target.kind,
        })
    }
}

impl Body for Projectile {
    fn body(&self) -> &Kinematics {
        &self.body
    }
}

impl Tracked for Projectile {
    fn id(&self) -> EntityId {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn exists(&self) -> bool {
        self.exists
    }
}
