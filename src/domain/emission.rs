// Per-call output buffer: entities request new world objects here instead of
// touching the registries, and the world drains it once the phase completes.

use crate::domain::praesidium::Praesidium;
use crate::domain::projectile::Projectile;
use crate::domain::state::{BuildRequest, ClientId};

/// A build command issued by a player, not yet validated against cost or radius.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOrder {
    pub owner: ClientId,
    pub request: BuildRequest,
}

#[derive(Debug, Default)]
pub struct Emissions {
    pub projectiles: Vec<Projectile>,
    pub praesidia: Vec<Praesidium>,
    pub builds: Vec<BuildOrder>,
}

impl Emissions {
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty() && self.praesidia.is_empty() && self.builds.is_empty()
    }
}
