//! The canonical world aggregate and the fixed arena map.

use crate::entities::{Bullet, Enemy, LootBox, Mine, Pickup, Player, Wall};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `(x, y, width, height)` of every indestructible wall in the arena.
pub const MAP_WALLS: [(f32, f32, f32, f32); 35] = [
    // Border
    (0.0, 0.0, 4000.0, 20.0),
    (0.0, 2980.0, 4000.0, 20.0),
    (0.0, 0.0, 20.0, 3000.0),
    (3980.0, 0.0, 20.0, 3000.0),
    // Central hub and its corridors
    (1800.0, 1300.0, 400.0, 400.0),
    (1800.0, 1100.0, 400.0, 20.0),
    (1800.0, 1700.0, 400.0, 20.0),
    (1600.0, 1300.0, 20.0, 400.0),
    (2180.0, 1300.0, 20.0, 400.0),
    // Side rooms
    (800.0, 800.0, 400.0, 400.0),
    (2800.0, 800.0, 400.0, 400.0),
    (800.0, 1800.0, 400.0, 400.0),
    (2800.0, 1800.0, 400.0, 400.0),
    // Boss rooms
    (400.0, 400.0, 300.0, 300.0),
    (3300.0, 400.0, 300.0, 300.0),
    (400.0, 2300.0, 300.0, 300.0),
    // Room entrances
    (800.0, 1100.0, 20.0, 200.0),
    (3180.0, 1100.0, 20.0, 200.0),
    (800.0, 1700.0, 20.0, 200.0),
    (3180.0, 1700.0, 20.0, 200.0),
    // Boss room entrances
    (400.0, 700.0, 200.0, 20.0),
    (3400.0, 700.0, 200.0, 20.0),
    (400.0, 2000.0, 200.0, 20.0),
    // Maze corridors
    (1200.0, 600.0, 20.0, 400.0),
    (1200.0, 2000.0, 20.0, 400.0),
    (2800.0, 600.0, 20.0, 400.0),
    (2800.0, 2000.0, 20.0, 400.0),
    (600.0, 1200.0, 400.0, 20.0),
    (600.0, 1600.0, 400.0, 20.0),
    (3000.0, 1200.0, 400.0, 20.0),
    (3000.0, 1600.0, 400.0, 20.0),
    // Connectors
    (1400.0, 800.0, 20.0, 200.0),
    (2600.0, 800.0, 20.0, 200.0),
    (1400.0, 2000.0, 20.0, 200.0),
    (2600.0, 2000.0, 20.0, 200.0),
];

pub const ENEMY_SPAWN_POINTS: [(f32, f32); 11] = [
    (500.0, 500.0),
    (3400.0, 500.0),
    (500.0, 2400.0),
    (900.0, 900.0),
    (2900.0, 900.0),
    (900.0, 1900.0),
    (2900.0, 1900.0),
    (1900.0, 1100.0),
    (1900.0, 1700.0),
    (1700.0, 1400.0),
    (2100.0, 1400.0),
];

pub const BOSS_SPAWN_POINTS: [(f32, f32); 3] = [(550.0, 550.0), (3450.0, 550.0), (550.0, 2450.0)];

pub fn map_walls() -> Vec<Wall> {
    MAP_WALLS
        .iter()
        .map(|&(x, y, width, height)| Wall::fixed(x, y, width, height))
        .collect()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorldState {
    pub players: BTreeMap<u32, Player>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub walls: Vec<Wall>,
    pub mines: Vec<Mine>,
    pub pickups: Vec<Pickup>,
    pub lootboxes: Vec<LootBox>,
    pub game_over: bool,
    pub wave: u32,
    /// Seconds until the next wave starts.
    pub wave_cooldown: f32,
    /// Points per player id; a missing entry means zero.
    pub scores: BTreeMap<u32, u32>,
}

impl WorldState {
    /// A fresh match on the standard arena map.
    pub fn new() -> Self {
        Self {
            walls: map_walls(),
            ..Self::empty()
        }
    }

    /// A world with no geometry at all.
    pub fn empty() -> Self {
        Self {
            players: BTreeMap::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            walls: Vec::new(),
            mines: Vec::new(),
            pickups: Vec::new(),
            lootboxes: Vec::new(),
            game_over: false,
            wave: 1,
            wave_cooldown: 0.0,
            scores: BTreeMap::new(),
        }
    }

    pub fn score(&self, player_id: u32) -> u32 {
        self.scores.get(&player_id).copied().unwrap_or(0)
    }

    pub fn award(&mut self, player_id: u32, points: u32) {
        *self.scores.entry(player_id).or_insert(0) += points;
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.dead)
    }

    /// True iff at least one player exists and every player is dead.
    pub fn all_players_dead(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.dead)
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}
