// Praesidium pallets: the resource players collect and spend on constructs.
//
// Ambient pallets sit still. Pallets dropped by a death are launched outward
// and slow to a stop, after which they behave like ambient ones.

use std::f64::consts::TAU;

use rand::Rng;

use crate::domain::errors::EntityFault;
use crate::domain::kinematics::{Body, Kinematics};
use crate::domain::registry::{PlayerRegistry, Tracked};
use crate::domain::state::{ClientId, EntityId};
use crate::domain::tuning::{PraesidiumTuning, WorldTuning};

#[derive(Debug, Clone)]
pub struct Praesidium {
    pub id: EntityId,
    pub body: Kinematics,
    /// Praesidia granted to whoever picks this pallet up.
    pub quantity: u32,
    /// Linear slow-down in px/ms²; zero for ambient pallets.
    pub deceleration: f64,
    pub exists: bool,
}

impl Praesidium {
    pub fn ambient_at(x: f64, y: f64, quantity: u32, radius: f64) -> Self {
        Self {
            id: EntityId::default(),
            body: Kinematics::at(x, y, 0.0, radius),
            quantity,
            deceleration: 0.0,
            exists: true,
        }
    }

    /// Resupply pallet at a random point with a random quantity.
    pub fn ambient(world: &WorldTuning, tuning: &PraesidiumTuning, rng: &mut impl Rng) -> Self {
        let (x, y) = world.random_point(rng);
        let low = tuning.ambient_min_quantity.min(tuning.ambient_max_quantity);
        let quantity = rng.random_range(low..=tuning.ambient_max_quantity.max(low));
        Self::ambient_at(x, y, quantity, tuning.radius)
    }

    /// Splits `total` into pallets of at most `burst_pallet_quantity` each and
    /// launches them in random directions from (x, y). The quantities always sum to `total`.
    pub fn burst(
        x: f64,
        y: f64,
        total: u32,
        tuning: &PraesidiumTuning,
        rng: &mut impl Rng,
    ) -> Vec<Self> {
        let chunk = tuning.burst_pallet_quantity.max(1);
        let mut pallets = Vec::with_capacity(total.div_ceil(chunk) as usize);
        let mut left = total;
        while left > 0 {
            let quantity = left.min(chunk);
            left -= quantity;

            let angle = rng.random_range(0.0..TAU);
            let speed = if tuning.burst_max_speed > tuning.burst_min_speed {
                rng.random_range(tuning.burst_min_speed..tuning.burst_max_speed)
            } else {
                tuning.burst_min_speed
            };
            let mut pallet = Self::ambient_at(x, y, quantity, tuning.radius);
            pallet.body = pallet
                .body
                .with_velocity(speed * angle.cos(), speed * angle.sin());
            pallet.deceleration = tuning.burst_deceleration;
            pallets.push(pallet);
        }
        pallets
    }

    /// Moves the pallet and hands it to the first overlapping live player in registry order.
    pub fn tick(
        &mut self,
        now: u64,
        players: &mut PlayerRegistry,
        world: &WorldTuning,
    ) -> Result<Option<ClientId>, EntityFault> {
        self.body.ensure_finite()?;

        let elapsed = self.body.integrate(now);
        self.slow_down(elapsed);
        self.body.clamp_to(world);

        let Some(collector) = players
            .iter_mut()
            .find(|p| !p.is_dead() && p.collides_with(&self.body))
        else {
            return Ok(None);
        };

        collector.credit(self.quantity);
        self.exists = false;
        Ok(Some(collector.id))
    }

    fn slow_down(&mut self, elapsed: f64) {
        let speed = self.body.speed();
        if speed == 0.0 {
            return;
        }
        let slowed = (speed - self.deceleration * elapsed).max(0.0);
        if slowed == 0.0 {
            self.body.vx = 0.0;
            self.body.vy = 0.0;
        } else {
            let scale = slowed / speed;
            self.body.vx *= scale;
            self.body.vy *= scale;
        }
    }

    pub fn is_at_rest(&self) -> bool {
        self.body.vx == 0.0 && self.body.vy == 0.0
    }
}

impl Body for Praesidium {
    fn body(&self) -> &Kinematics {
        &self.body
    }
}

impl Tracked for Praesidium {
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
