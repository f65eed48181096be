// The authoritative world: owns every registry and runs the fixed-rate tick.

use std::collections::HashMap;

use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::domain::construct::Construct;
use crate::domain::emission::{BuildOrder, Emissions};
use crate::domain::kinematics::{Body, Kinematics};
use crate::domain::player::Player;
use crate::domain::praesidium::Praesidium;
use crate::domain::projectile::{Hit, Projectile};
use crate::domain::registry::{Arena, PlayerRegistry};
use crate::domain::state::{
    ClientId, ConstructSnapshot, LeaderboardEntry, PlayerInput, PlayerSnapshot,
    PraesidiumSnapshot, ProjectileSnapshot, Snapshot,
};
use crate::domain::tuning::Tuning;

pub struct World {
    tuning: Tuning,
    players: PlayerRegistry,
    constructs: Arena<Construct>,
    projectiles: Arena<Projectile>,
    praesidia: Arena<Praesidium>,
    /// Last latency estimate per client, in milliseconds.
    latency: HashMap<ClientId, i64>,
    rng: StdRng,
}

impl World {
    pub fn new(tuning: Tuning, rng: StdRng) -> Self {
        let mut world = Self {
            tuning,
            players: PlayerRegistry::new(),
            constructs: Arena::new(),
            projectiles: Arena::new(),
            praesidia: Arena::new(),
            latency: HashMap::new(),
            rng,
        };
        world.resupply();
        world
    }

    /// Spawns a player for a newly connected client. Returns false if the id is taken.
    pub fn add_player(&mut self, name: String, id: ClientId) -> bool {
        let player = Player::spawn(id, name, &self.tuning, &mut self.rng);
        let (x, y) = (player.body.x, player.body.y);
        if !self.players.insert(player) {
            warn!(player_id = id.0, "player id already registered");
            return false;
        }
        self.latency.insert(id, 0);
        info!(player_id = id.0, x, y, "player joined");
        true
    }

    /// Drops the player and every construct it owns. Unknown ids are ignored.
    pub fn remove_player(&mut self, id: ClientId) -> Option<Player> {
        let player = self.players.remove(id)?;
        self.latency.remove(&id);
        let purged = self.constructs.remove_where(|c| c.owner == id);
        info!(
            player_id = id.0,
            kills = player.kills,
            deaths = player.deaths,
            purged,
            "player left"
        );
        Some(player)
    }

    /// Applies one input frame as soon as it arrives. Only the addressed player is touched.
    pub fn apply_player_input(&mut self, id: ClientId, input: &PlayerInput, now: u64) {
        let Some(player) = self.players.get_mut(id) else {
            // Input raced with a disconnect.
            return;
        };

        if let Some(latency) = input.timestamp.and_then(|sent| latency_ms(now, sent)) {
            self.latency.insert(id, latency);
        }

        let mut out = Emissions::default();
        player.apply_input(input, now, &self.tuning, &mut out);

        self.projectiles.extend(out.projectiles);
        for order in out.builds {
            self.try_build(order);
        }
    }

    fn try_build(&mut self, order: BuildOrder) {
        let Some(player) = self.players.get_mut(order.owner) else {
            return;
        };
        let request = order.request;
        let construct = &self.tuning.construct;
        let cost = construct.kind(request.kind).cost;

        let reach = construct.build_radius;
        let in_reach = player.body.distance_sq_to(request.x, request.y) <= reach * reach;
        let in_world = self.tuning.world.contains(request.x, request.y);
        let affordable = player.praesidia >= cost;

        if !(in_reach && in_world && affordable) {
            debug!(
                player_id = order.owner.0,
                kind = ?request.kind,
                in_reach,
                in_world,
                affordable,
                "build rejected"
            );
            return;
        }

        player.spend(cost);
        let id = self
            .constructs
            .insert(Construct::build(order.owner, request, construct));
        debug!(
            player_id = order.owner.0,
            construct_id = id.0,
            kind = ?request.kind,
            x = request.x,
            y = request.y,
            "construct built"
        );
    }

    /// Runs one full simulation step at logical time `now`.
    ///
    /// Phases run in a fixed order: players, projectiles, constructs, pallets, resupply.
    /// Deaths are settled before pallets move, so no snapshot shows a dead player.
    /// An entity whose tick faults is logged and dropped (or respawned, for players)
    /// without aborting the rest of the tick.
    pub fn tick(&mut self, now: u64) {
        self.tick_players(now);
        self.tick_projectiles(now);
        self.tick_constructs(now);
        self.settle_deaths();
        self.tick_praesidia(now);
        self.resupply();
    }

    fn tick_players(&mut self, now: u64) {
        for player in self.players.iter_mut() {
            if let Err(fault) = player.tick(now, &self.tuning) {
                warn!(player_id = player.id.0, %fault, "player state corrupt, respawning");
                let spawn = self.tuning.world.random_point(&mut self.rng);
                player.body = Kinematics::at(spawn.0, spawn.1, 0.0, self.tuning.player.radius);
                player.health = player.max_health;
            }
        }
        self.settle_deaths();
    }

    /// Respawns every player whose health ran out and drops their burst.
    fn settle_deaths(&mut self) {
        if !self.players.iter().any(Player::is_dead) {
            return;
        }
        let positions: Vec<(ClientId, (f64, f64))> = self
            .players
            .iter()
            .map(|p| (p.id, (p.body.x, p.body.y)))
            .collect();

        let mut out = Emissions::default();
        for player in self.players.iter_mut().filter(|p| p.is_dead()) {
            let rivals: Vec<(f64, f64)> = positions
                .iter()
                .filter(|(id, _)| *id != player.id)
                .map(|&(_, at)| at)
                .collect();
            player.settle_death(&rivals, &self.tuning, &mut self.rng, &mut out);
        }
        self.praesidia.extend(out.praesidia);
    }

    fn tick_projectiles(&mut self, now: u64) {
        for shot in self.projectiles.iter_mut().filter(|p| p.exists) {
            let result = shot.tick(
                now,
                &mut self.players,
                self.constructs.as_mut_slice(),
                &self.tuning.world,
                &self.tuning.projectile,
            );
            match result {
                Ok(Some(Hit::Player { victim, killed: true })) => {
                    let kills = self.players.get(shot.owner).map(|p| p.kills);
                    info!(
                        victim_id = victim.0,
                        shooter_id = shot.owner.0,
                        kills,
                        "player killed"
                    );
                }
                Ok(Some(Hit::Construct { id, kind })) => {
                    debug!(construct_id = id.0, shooter_id = shot.owner.0, ?kind, "construct hit");
                }
                Ok(_) => {}
                Err(fault) => {
                    warn!(projectile_id = shot.id.0, %fault, "projectile state corrupt, evicting");
                    shot.exists = false;
                }
            }
        }
        self.projectiles.sweep();
    }

    fn tick_constructs(&mut self, now: u64) {
        let mut out = Emissions::default();
        let constructs = self.constructs.as_mut_slice();
        for i in 0..constructs.len() {
            let (before, rest) = constructs.split_at_mut(i);
            let Some((current, after)) = rest.split_first_mut() else {
                break;
            };
            if !current.exists {
                continue;
            }
            let others = before.iter().chain(after.iter());
            let result = current.tick(
                now,
                &mut self.players,
                others,
                &self.tuning,
                &mut self.rng,
                &mut out,
            );
            if let Err(fault) = result {
                warn!(construct_id = current.id.0, %fault, "construct state corrupt, evicting");
                current.exists = false;
            }
        }
        self.projectiles.extend(out.projectiles);
        self.praesidia.extend(out.praesidia);
        self.constructs.sweep();
    }

    fn tick_praesidia(&mut self, now: u64) {
        for pallet in self.praesidia.iter_mut().filter(|p| p.exists) {
            match pallet.tick(now, &mut self.players, &self.tuning.world) {
                Ok(Some(collector)) => {
                    debug!(
                        player_id = collector.0,
                        quantity = pallet.quantity,
                        "praesidia collected"
                    );
                }
                Ok(None) => {}
                Err(fault) => {
                    warn!(pallet_id = pallet.id.0, %fault, "pallet state corrupt, evicting");
                    pallet.exists = false;
                }
            }
        }
        self.praesidia.sweep();
    }

    fn resupply(&mut self) {
        let missing = self
            .tuning
            .praesidium
            .minimum_count
            .saturating_sub(self.praesidia.live_count());
        for _ in 0..missing {
            let pallet = Praesidium::ambient(&self.tuning.world, &self.tuning.praesidium, &mut self.rng);
            self.praesidia.insert(pallet);
        }
    }

    /// Builds what `observer` may see. None if the observer has no player.
    pub fn compute_snapshot(&self, observer: ClientId) -> Option<Snapshot> {
        let me = self.players.get(observer)?;
        let world = &self.tuning.world;

        let mut ranked: Vec<&Player> = self.players.iter().collect();
        // Stable sort keeps registry order among equal kill counts.
        ranked.sort_by(|a, b| b.kills.cmp(&a.kills));
        let leaderboard = ranked
            .into_iter()
            .take(self.tuning.snapshot.leaderboard_size)
            .map(LeaderboardEntry::from)
            .collect();

        Some(Snapshot {
            leaderboard,
            own: PlayerSnapshot::from(me),
            players: self
                .players
                .iter()
                .filter(|p| p.id != observer && p.is_visible_to(me, world))
                .map(PlayerSnapshot::from)
                .collect(),
            projectiles: self
                .projectiles
                .iter()
                .filter(|p| p.exists && p.is_visible_to(me, world))
                .map(ProjectileSnapshot::from)
                .collect(),
            constructs: self
                .constructs
                .iter()
                .filter(|c| c.exists && c.is_visible_to(me, world))
                .map(ConstructSnapshot::from)
                .collect(),
            praesidia: self
                .praesidia
                .iter()
                .filter(|p| p.exists && p.is_visible_to(me, world))
                .map(PraesidiumSnapshot::from)
                .collect(),
            latency: self.latency(observer),
        })
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn latency(&self, id: ClientId) -> i64 {
        self.latency.get(&id).copied().unwrap_or(0)
    }
}

/// Signed round-trip estimate. None when either clock is outside the signed range.
fn latency_ms(now: u64, sent: u64) -> Option<i64> {
    let now = i64::try_from(now).ok()?;
    let sent = i64::try_from(sent).ok()?;
    Some(now.saturating_sub(sent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::construct::ConstructKind;
    use crate::domain::state::{BuildRequest, KeyboardState};
    use rand::SeedableRng;

    fn quiet_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.praesidium.minimum_count = 0;
        tuning
    }

    fn world_with(players: &[(u64, f64, f64)]) -> World {
        let mut world = World::new(quiet_tuning(), StdRng::seed_from_u64(42));
        for &(id, x, y) in players {
            assert!(world.add_player(format!("p{id}"), ClientId(id)));
            place(&mut world, id, x, y);
        }
        world
    }

    fn place(world: &mut World, id: u64, x: f64, y: f64) {
        world
            .players
            .get_mut(ClientId(id))
            .expect("registered player")
            .body
            .teleport((x, y));
    }

    fn build_input(kind: ConstructKind, x: f64, y: f64) -> PlayerInput {
        PlayerInput {
            keyboard: KeyboardState::default(),
            orientation: 0.0,
            shoot: false,
            build: Some(BuildRequest { kind, x, y }),
            timestamp: None,
        }
    }

    fn fire_at(world: &mut World, owner: u64, x: f64, y: f64) {
        let shot = Projectile::fire(x, y, 0.0, ClientId(owner), &world.tuning.projectile);
        world.projectiles.insert(shot);
    }

    #[test]
    fn when_broke_player_builds_turret_then_request_is_rejected() {
        let mut world = world_with(&[(1, 100.0, 100.0)]);

        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Turret, 110.0, 100.0), 0);
        world.tick(16);

        let snapshot = world.compute_snapshot(ClientId(1)).expect("observer exists");
        assert!(snapshot.constructs.is_empty());
        assert_eq!(snapshot.own.praesidia, 0);
    }

    #[test]
    fn when_player_can_afford_turret_then_it_appears_with_full_health() {
        let mut world = world_with(&[(1, 100.0, 100.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 35;

        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Turret, 110.0, 100.0), 0);
        world.tick(16);

        let snapshot = world.compute_snapshot(ClientId(1)).expect("observer exists");
        assert_eq!(snapshot.constructs.len(), 1);
        let turret = &snapshot.constructs[0];
        assert_eq!(turret.kind, ConstructKind::Turret);
        assert_eq!((turret.x, turret.y), (110.0, 100.0));
        assert_eq!(turret.health, world.tuning.construct.turret.max_health);
        assert_eq!(snapshot.own.praesidia, 5);
    }

    #[test]
    fn when_build_is_beyond_build_radius_then_rejected_and_nothing_spent() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 100;

        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Wall, 629.0, 500.0), 0);

        assert!(world.constructs.is_empty());
        assert_eq!(world.player(ClientId(1)).map(|p| p.praesidia), Some(100));
    }

    #[test]
    fn when_build_is_exactly_on_build_radius_then_accepted() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 15;

        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Wall, 628.0, 500.0), 0);

        assert_eq!(world.constructs.len(), 1);
        assert_eq!(world.player(ClientId(1)).map(|p| p.praesidia), Some(0));
    }

    #[test]
    fn when_build_lands_outside_world_then_rejected() {
        let mut world = world_with(&[(1, 5.0, 5.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 100;

        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Wall, -10.0, 5.0), 0);

        assert!(world.constructs.is_empty());
        assert_eq!(world.player(ClientId(1)).map(|p| p.praesidia), Some(100));
    }

    #[test]
    fn when_shot_hits_then_victim_loses_health_and_tenth_hit_kills() {
        let mut world = world_with(&[(1, 500.0, 500.0), (2, 900.0, 900.0)]);

        fire_at(&mut world, 2, 500.0, 500.0);
        world.tick(0);
        assert_eq!(world.player(ClientId(1)).map(|p| p.health), Some(9));
        assert!(world.projectiles.is_empty());

        for n in 1..9u64 {
            fire_at(&mut world, 2, 500.0, 500.0);
            world.tick(n);
        }
        assert_eq!(world.player(ClientId(1)).map(|p| p.health), Some(1));

        fire_at(&mut world, 2, 500.0, 500.0);
        world.tick(10);
        assert_eq!(world.player(ClientId(2)).map(|p| p.kills), Some(1));
        let snapshot = world.compute_snapshot(ClientId(1)).expect("observer exists");
        assert_eq!(snapshot.own.health, 10);
        assert_eq!(snapshot.own.deaths, 1);
        assert_ne!((snapshot.own.x, snapshot.own.y), (500.0, 500.0));
    }

    #[test]
    fn when_turret_lands_the_killing_shot_then_victim_respawns_away_from_rivals() {
        let mut world = world_with(&[(1, 1250.0, 1250.0), (2, 1250.0, 1150.0)]);
        world.tuning.player.respawn_attempts = 64;
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 30;
        world.players.get_mut(ClientId(2)).expect("registered").health = 1;
        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Turret, 1250.0, 1160.0), 0);

        world.tick(0);
        assert_eq!(world.projectiles.len(), 1);
        world.tick(1);

        let victim = world.player(ClientId(2)).expect("still connected");
        assert_eq!((victim.health, victim.deaths), (10, 1));
        let d_sq = (victim.body.x - 1250.0).powi(2) + (victim.body.y - 1250.0).powi(2);
        assert!(d_sq >= world.tuning.player.respawn_buffer.powi(2));
    }

    #[test]
    fn when_pallet_overlaps_two_players_then_first_registered_collects() {
        let mut world = world_with(&[(1, 500.0, 500.0), (2, 505.0, 500.0)]);
        world
            .praesidia
            .insert(Praesidium::ambient_at(502.0, 500.0, 7, 10.0));

        world.tick(0);

        assert_eq!(world.player(ClientId(1)).map(|p| p.praesidia), Some(7));
        assert_eq!(world.player(ClientId(2)).map(|p| p.praesidia), Some(0));
        assert!(world.praesidia.is_empty());
    }

    #[test]
    fn when_player_leaves_then_their_constructs_vanish() {
        let mut world = world_with(&[(1, 500.0, 500.0), (2, 1500.0, 1500.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 30;
        world.players.get_mut(ClientId(2)).expect("registered").praesidia = 15;
        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Wall, 520.0, 500.0), 0);
        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Wall, 480.0, 500.0), 0);
        world.apply_player_input(ClientId(2), &build_input(ConstructKind::Wall, 1500.0, 1520.0), 0);

        let removed = world.remove_player(ClientId(1));

        assert!(removed.is_some());
        assert_eq!(world.constructs.len(), 1);
        assert!(world.constructs.iter().all(|c| c.owner == ClientId(2)));
        assert!(world.remove_player(ClientId(1)).is_none());
    }

    #[test]
    fn when_input_targets_unknown_player_then_nothing_happens() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);

        world.apply_player_input(ClientId(9), &build_input(ConstructKind::Wall, 500.0, 500.0), 0);

        assert!(world.constructs.is_empty());
        assert_eq!(world.players.len(), 1);
    }

    #[test]
    fn when_input_carries_timestamp_then_latency_is_estimated() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);
        let mut input = build_input(ConstructKind::Wall, 500.0, 500.0);
        input.build = None;
        input.timestamp = Some(9_960);

        world.apply_player_input(ClientId(1), &input, 10_000);

        assert_eq!(world.compute_snapshot(ClientId(1)).map(|s| s.latency), Some(40));
    }

    #[test]
    fn when_timestamp_exceeds_signed_range_then_latency_is_kept() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);
        let mut input = build_input(ConstructKind::Wall, 500.0, 500.0);
        input.build = None;
        input.timestamp = Some(9_960);
        world.apply_player_input(ClientId(1), &input, 10_000);

        input.timestamp = Some(9_223_372_036_854_775_808);
        world.apply_player_input(ClientId(1), &input, 1_700_000_000_000);

        assert_eq!(world.latency(ClientId(1)), 40);
    }

    #[test]
    fn when_other_player_is_outside_window_then_snapshot_excludes_it() {
        let world = world_with(&[(1, 500.0, 500.0), (2, 925.0, 825.0), (3, 926.0, 500.0)]);

        let snapshot = world.compute_snapshot(ClientId(1)).expect("observer exists");

        let visible: Vec<ClientId> = snapshot.players.iter().map(|p| p.id).collect();
        assert_eq!(visible, vec![ClientId(2)]);
        assert_eq!(snapshot.own.id, ClientId(1));
        assert!(world.compute_snapshot(ClientId(9)).is_none());
    }

    #[test]
    fn when_kills_tie_then_leaderboard_keeps_registry_order() {
        let mut world = world_with(&[(1, 100.0, 100.0), (2, 200.0, 200.0), (3, 300.0, 300.0)]);
        world.tuning.snapshot.leaderboard_size = 2;
        world.players.get_mut(ClientId(2)).expect("registered").kills = 1;
        world.players.get_mut(ClientId(3)).expect("registered").kills = 1;

        let snapshot = world.compute_snapshot(ClientId(1)).expect("observer exists");

        let names: Vec<&str> = snapshot.leaderboard.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["p2", "p3"]);
    }

    #[test]
    fn when_pallets_run_low_then_world_resupplies_to_the_floor() {
        let mut world = World::new(Tuning::default(), StdRng::seed_from_u64(1));
        let floor = world.tuning.praesidium.minimum_count;
        assert_eq!(world.praesidia.live_count(), floor);

        world.praesidia.remove_where(|_| true);
        world.tick(0);

        assert_eq!(world.praesidia.live_count(), floor);
    }

    #[test]
    fn when_enemy_walks_into_turret_range_then_turret_shot_is_registered() {
        let mut world = world_with(&[(1, 500.0, 500.0), (2, 500.0, 700.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").praesidia = 30;
        world.apply_player_input(ClientId(1), &build_input(ConstructKind::Turret, 500.0, 520.0), 0);

        world.tick(0);

        assert_eq!(world.projectiles.len(), 1);
        assert!(world.projectiles.iter().all(|p| p.owner == ClientId(1)));
    }

    #[test]
    fn when_one_projectile_is_corrupt_then_it_is_evicted_and_the_rest_still_tick() {
        let mut world = world_with(&[(1, 500.0, 500.0), (2, 900.0, 900.0)]);
        fire_at(&mut world, 2, 1200.0, 1200.0);
        world.projectiles.iter_mut().for_each(|p| p.body.x = f64::NAN);
        fire_at(&mut world, 2, 500.0, 500.0);

        world.tick(0);

        assert!(world.projectiles.is_empty());
        assert_eq!(world.player(ClientId(1)).map(|p| p.health), Some(9));
    }

    #[test]
    fn when_player_state_is_corrupt_then_player_is_respawned_in_bounds() {
        let mut world = world_with(&[(1, 500.0, 500.0)]);
        world.players.get_mut(ClientId(1)).expect("registered").body.vx = f64::INFINITY;

        world.tick(0);

        let player = world.player(ClientId(1)).expect("still connected");
        assert!(player.body.ensure_finite().is_ok());
        assert!(world.tuning.world.contains(player.body.x, player.body.y));
    }
}
