use super::types::GameEvent;
use crate::domain::{ClientId, Snapshot, World};
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Logical simulation time in milliseconds.
///
/// Uses the Unix epoch so the latency estimate can be taken against the
/// client's own wall clock (`Date.now()` on the browser side).
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock;

impl SimClock {
    pub fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

// Delivery state for one connected client.
struct Session {
    snapshot_tx: mpsc::Sender<Snapshot>,
    dropped: u64,
    last_full_log: Instant,
}

/// Owns the world and is the only code that mutates it.
///
/// Events are applied as soon as they are received; the full simulation step and
/// snapshot fan-out run on the fixed interval. Exits when every event sender is gone.
pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    mut world: World,
    clock: SimClock,
    tick_interval: Duration,
) {
    let mut sessions: HashMap<ClientId, Session> = HashMap::new();

    // Drive the fixed-step game loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    // A slow tick should not be followed by a burst of catch-up ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("event channel closed; world task exiting");
                    break;
                };
                apply_event(&mut world, &mut sessions, event, clock.now());
            }
            _ = interval.tick() => {
                tick += 1;
                world.tick(clock.now());
                publish_snapshots(&world, &mut sessions, tick);
            }
        }
    }
}

fn apply_event(
    world: &mut World,
    sessions: &mut HashMap<ClientId, Session>,
    event: GameEvent,
    now: u64,
) {
    match event {
        GameEvent::Join {
            client_id,
            name,
            snapshot_tx,
        } => {
            if world.add_player(name, client_id) {
                sessions.insert(
                    client_id,
                    Session {
                        snapshot_tx,
                        dropped: 0,
                        last_full_log: Instant::now() - LOG_THROTTLE,
                    },
                );
            }
        }
        GameEvent::Leave { client_id } => {
            if let Some(session) = sessions.remove(&client_id) {
                debug!(
                    client_id = client_id.0,
                    dropped = session.dropped,
                    "snapshot session closed"
                );
            }
            world.remove_player(client_id);
        }
        GameEvent::Input { client_id, input } => {
            world.apply_player_input(client_id, &input, now);
        }
    }
}

fn publish_snapshots(world: &World, sessions: &mut HashMap<ClientId, Session>, tick: u64) {
    for (client_id, session) in sessions.iter_mut() {
        // Visibility is recomputed per observer on every tick.
        let Some(snapshot) = world.compute_snapshot(*client_id) else {
            continue;
        };
        match session.snapshot_tx.try_send(snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                session.dropped += 1;
                if session.last_full_log.elapsed() >= LOG_THROTTLE {
                    session.last_full_log = Instant::now();
                    warn!(
                        client_id = client_id.0,
                        tick,
                        dropped = session.dropped,
                        "snapshot channel full; dropping snapshot"
                    );
                }
            }
            // The connection is tearing down; its Leave event is on the way.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
