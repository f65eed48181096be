// Player-placed structures that act on their own every tick.

use std::f64::consts::PI;

use rand::Rng;
use tracing::debug;

use crate::domain::emission::Emissions;
use crate::domain::errors::EntityFault;
use crate::domain::kinematics::{Body, Kinematics};
use crate::domain::player::Player;
use crate::domain::praesidium::Praesidium;
use crate::domain::projectile::Projectile;
use crate::domain::registry::{PlayerRegistry, Tracked};
use crate::domain::state::{BuildRequest, ClientId, EntityId};
use crate::domain::tuning::{ConstructTuning, Tuning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Turret,
    Wall,
    Healer,
}

impl ConstructKind {
    pub fn name(self) -> &'static str {
        match self {
            ConstructKind::Turret => "turret",
            ConstructKind::Wall => "wall",
            ConstructKind::Healer => "healer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "turret" => Some(ConstructKind::Turret),
            "wall" => Some(ConstructKind::Wall),
            "healer" => Some(ConstructKind::Healer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Construct {
    pub id: EntityId,
    pub kind: ConstructKind,
    pub owner: ClientId,
    pub body: Kinematics,
    /// Time of the last shot or heal.
    pub last_action: Option<u64>,
    pub health: i32,
    pub exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Player(ClientId),
    Construct(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub kind: TargetKind,
    pub x: f64,
    pub y: f64,
}

impl Construct {
    pub fn build(owner: ClientId, request: BuildRequest, tuning: &ConstructTuning) -> Self {
        let table = tuning.kind(request.kind);
        Self {
            id: EntityId::default(),
            kind: request.kind,
            owner,
            body: Kinematics::at(request.x, request.y, 0.0, table.radius),
            last_action: None,
            health: table.max_health,
            exists: true,
        }
    }

    /// Closest enemy strictly inside `range`. Players always win over constructs;
    /// constructs are only considered when no player qualifies. On equal distance
    /// the candidate seen first is kept.
    pub fn select_target<'p, 'c>(
        &self,
        players: impl IntoIterator<Item = &'p Player>,
        constructs: impl IntoIterator<Item = &'c Construct>,
        range: f64,
    ) -> Option<Target> {
        let range_sq = range * range;

        let player = nearest(
            players
                .into_iter()
                .filter(|p| p.id != self.owner && !p.is_dead())
                .map(|p| (TargetKind::Player(p.id), &p.body)),
            &self.body,
            range_sq,
        );
        if player.is_some() {
            return player;
        }

        nearest(
            constructs
                .into_iter()
                .filter(|c| c.owner != self.owner && c.exists && c.health > 0)
                .map(|c| (TargetKind::Construct(c.id), &c.body)),
            &self.body,
            range_sq,
        )
    }

    /// Runs the kind-specific behavior, then resolves destruction.
    ///
    /// `others` are every other construct in the world; this one is never among them.
    pub fn tick<'a>(
        &mut self,
        now: u64,
        players: &mut PlayerRegistry,
        others: impl IntoIterator<Item = &'a Construct>,
        tuning: &Tuning,
        rng: &mut impl Rng,
        out: &mut Emissions,
    ) -> Result<(), EntityFault> {
        self.body.ensure_finite()?;

        match self.kind {
            ConstructKind::Turret => self.aim_and_fire(now, players, others, tuning, out),
            ConstructKind::Wall => {}
            ConstructKind::Healer => self.heal_owner(now, players, &tuning.construct),
        }

        if self.health <= 0 {
            self.exists = false;
            let payout = tuning.construct.payout(self.kind);
            out.praesidia.extend(Praesidium::burst(
                self.body.x,
                self.body.y,
                payout,
                &tuning.praesidium,
                rng,
            ));
            debug!(
                construct_id = self.id.0,
                owner_id = self.owner.0,
                kind = ?self.kind,
                payout,
                "construct destroyed"
            );
        }
        Ok(())
    }

    fn aim_and_fire<'a>(
        &mut self,
        now: u64,
        players: &PlayerRegistry,
        others: impl IntoIterator<Item = &'a Construct>,
        tuning: &Tuning,
        out: &mut Emissions,
    ) {
        let Some(target) = self.select_target(players.iter(), others, tuning.construct.turret_range)
        else {
            return;
        };

        let dx = target.x - self.body.x;
        let dy = target.y - self.body.y;
        // 0 points up the screen and angles grow clockwise, matching player aim.
        self.body.orientation = -dx.atan2(dy) + PI;

        if self.ready(now, tuning.construct.turret.cooldown_ms) {
            self.last_action = Some(now);
            out.projectiles.push(Projectile::fire(
                self.body.x,
                self.body.y,
                self.body.orientation,
                self.owner,
                &tuning.projectile,
            ));
        }
    }

    fn heal_owner(&mut self, now: u64, players: &mut PlayerRegistry, tuning: &ConstructTuning) {
        let Some(owner) = players.get_mut(self.owner) else {
            return;
        };
        // A dead owner respawns at full health once the tick settles deaths.
        if owner.is_dead() {
            return;
        }
        let range_sq = tuning.healer_range * tuning.healer_range;
        if self.body.distance_sq_to(owner.body.x, owner.body.y) >= range_sq {
            return;
        }
        if self.ready(now, tuning.healer.cooldown_ms) {
            self.last_action = Some(now);
            owner.heal(tuning.heal_amount);
        }
    }

    fn ready(&self, now: u64, cooldown: u64) -> bool {
        match self.last_action {
            Some(last) => now >= last.saturating_add(cooldown),
            None => true,
        }
    }

    /// Health may go negative here; `tick` resolves the destruction.
    pub fn damage(&mut self, amount: i32) {
        self.health -= amount;
    }
}

fn nearest<'k>(
    candidates: impl Iterator<Item = (TargetKind, &'k Kinematics)>,
    from: &Kinematics,
    range_sq: f64,
) -> Option<Target> {
    let mut best: Option<(f64, Target)> = None;
    for (kind, body) in candidates {
        let d = from.distance_sq_to(body.x, body.y);
        if d >= range_sq {
            continue;
        }
        if best.as_ref().is_none_or(|(best_d, _)| d < *best_d) {
            best = Some((
                d,
                Target {
                    kind,
                    x: body.x,
                    y: body.y,
                },
            ));
        }
    }
    best.map(|(_, target)| target)
}

impl Body for Construct {
    fn body(&self) -> &Kinematics {
        &self.body
    }
}

impl Tracked for Construct {
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
