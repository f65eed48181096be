// Entity storage owned by the world.
//
// Both registries are dense vectors: iteration order is deterministic and removal
// is a swap with the last element. Players are additionally indexed by client id.

use std::collections::HashMap;

use crate::domain::player::Player;
use crate::domain::state::{ClientId, EntityId};

/// Objects stored in an [`Arena`].
pub trait Tracked {
    fn id(&self) -> EntityId;
    fn assign_id(&mut self, id: EntityId);
    /// Advisory flag; once false the arena drops the entity on the next sweep.
    fn exists(&self) -> bool;
}

#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
    next_id: u64,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: Tracked> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut item: T) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        item.assign_id(id);
        self.items.push(item);
        id
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.insert(item);
        }
    }

    /// Drops every entity whose existence flag is false. Returns how many were dropped.
    pub fn sweep(&mut self) -> usize {
        self.remove_where(|item| !item.exists())
    }

    pub fn remove_where(&mut self, mut doomed: impl FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        let mut i = 0;
        while i < self.items.len() {
            if doomed(&self.items[i]) {
                self.items.swap_remove(i);
            } else {
                i += 1;
            }
        }
        before - self.items.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn live_count(&self) -> usize {
        self.items.iter().filter(|item| item.exists()).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }
}

#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Vec<Player>,
    index: HashMap<ClientId, usize>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player. Returns false (and keeps the existing one) on a duplicate id.
    pub fn insert(&mut self, player: Player) -> bool {
        if self.index.contains_key(&player.id) {
            return false;
        }
        self.index.insert(player.id, self.players.len());
        self.players.push(player);
        true
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Player> {
        let slot = self.index.remove(&id)?;
        let removed = self.players.swap_remove(slot);
        if let Some(moved) = self.players.get(slot) {
            self.index.insert(moved.id, slot);
        }
        Some(removed)
    }

    pub fn get(&self, id: ClientId) -> Option<&Player> {
        self.index.get(&id).map(|&slot| &self.players[slot])
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Player> {
        self.index.get(&id).map(|&slot| &mut self.players[slot])
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Player> {
        self.players.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::praesidium::Praesidium;
    use crate::domain::tuning::Tuning;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn player(id: u64) -> Player {
        let mut rng = StdRng::seed_from_u64(id);
        Player::spawn(ClientId(id), format!("p{id}"), &Tuning::default(), &mut rng)
    }

    #[test]
    fn when_player_removed_from_middle_then_index_follows_swapped_player() {
        let mut players = PlayerRegistry::new();
        for id in 1..=3 {
            assert!(players.insert(player(id)));
        }

        let removed = players.remove(ClientId(1)).expect("player 1 is registered");

        assert_eq!(removed.id, ClientId(1));
        assert_eq!(players.len(), 2);
        assert_eq!(players.get(ClientId(3)).map(|p| p.id), Some(ClientId(3)));
        assert_eq!(players.get(ClientId(2)).map(|p| p.id), Some(ClientId(2)));
        assert!(players.get(ClientId(1)).is_none());
    }

    #[test]
    fn when_removing_unknown_player_then_no_op() {
        let mut players = PlayerRegistry::new();
        players.insert(player(1));

        assert!(players.remove(ClientId(9)).is_none());
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn when_duplicate_player_inserted_then_rejected() {
        let mut players = PlayerRegistry::new();

        assert!(players.insert(player(4)));
        assert!(!players.insert(player(4)));
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn when_swept_then_only_existing_entities_remain_with_stable_ids() {
        let mut arena = Arena::new();
        let ids: Vec<EntityId> = (0..4)
            .map(|i| arena.insert(Praesidium::ambient_at(f64::from(i), 0.0, 1, 10.0)))
            .collect();
        arena.iter_mut().nth(1).expect("four pallets").exists = false;

        let dropped = arena.sweep();

        assert_eq!(dropped, 1);
        assert_eq!(arena.len(), 3);
        assert!(arena.get(ids[1]).is_none());
        assert!(arena.get(ids[3]).is_some());
        assert_eq!(arena.get(ids[3]).map(|p| p.body.x), Some(3.0));
    }
}
