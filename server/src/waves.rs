//! Wave spawner
//!
//! Regular waves trickle in `5 + wave` enemies, one per tick while fewer than
//! [`MAX_ALIVE_ENEMIES`] are alive. Every [`BOSS_WAVE_INTERVAL`]th wave wipes
//! the field and drops a single boss into one of the boss rooms instead.

use crate::game::GameState;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::geometry::Rect;
use shared::world::{BOSS_SPAWN_POINTS, ENEMY_SPAWN_POINTS};
use shared::{
    Enemy, EnemyKind, BOSS_WAVE_INTERVAL, MAX_ALIVE_ENEMIES, WAVE_COOLDOWN_SECONDS,
};

/// Clearance kept between a fresh enemy and the nearest wall.
const SPAWN_MARGIN: f32 = 10.0;
const SPAWN_ATTEMPTS_PER_RING: u32 = 100;
/// `(min, max)` distance from the base point, tried in order.
const SPAWN_RINGS: [(f32, f32); 2] = [(50.0, 300.0), (300.0, 500.0)];
/// Spawn positions must lie strictly inside this band of the arena.
const SPAWN_BOUNDS: (f32, f32, f32, f32) = (50.0, 50.0, 3950.0, 2950.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePhase {
    /// Waiting out `wave_cooldown`.
    Idle,
    /// `remaining` enemies still to be placed for the current wave.
    Spawning { remaining: u32 },
    /// Everything spawned has been killed.
    Cleared,
}

pub fn is_boss_wave(wave: u32) -> bool {
    wave > 0 && wave % BOSS_WAVE_INTERVAL == 0
}

impl GameState {
    pub(crate) fn update_waves(&mut self, dt: f32) {
        match self.wave_phase {
            WavePhase::Idle => {
                if self.world.wave_cooldown > 0.0 {
                    self.world.wave_cooldown = (self.world.wave_cooldown - dt).max(0.0);
                } else {
                    self.start_wave();
                }
            }
            WavePhase::Spawning { remaining } => {
                if remaining > 0 {
                    if self.world.enemies.len() < MAX_ALIVE_ENEMIES {
                        self.spawn_regular_enemy();
                        self.wave_phase = WavePhase::Spawning {
                            remaining: remaining - 1,
                        };
                    }
                } else if self.world.enemies.is_empty() {
                    info!("Wave {} cleared", self.world.wave);
                    self.wave_phase = WavePhase::Cleared;
                }
            }
            WavePhase::Cleared => {
                self.world.wave += 1;
                self.world.wave_cooldown = WAVE_COOLDOWN_SECONDS;
                self.wave_phase = WavePhase::Idle;
            }
        }
    }

    fn start_wave(&mut self) {
        let wave = self.world.wave;
        if is_boss_wave(wave) {
            self.world.enemies.clear();
            let base = BOSS_SPAWN_POINTS
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(BOSS_SPAWN_POINTS[0]);
            let (x, y) = self.find_enemy_spawn(base, EnemyKind::Boss.profile().size);
            let boss = self.make_enemy(EnemyKind::Boss, x, y);
            info!("Boss wave {}: boss {} at ({:.0}, {:.0})", wave, boss.id, x, y);
            self.world.enemies.push(boss);
            self.wave_phase = WavePhase::Spawning { remaining: 0 };
        } else {
            let count = 5 + wave;
            info!("Wave {} started with {} enemies", wave, count);
            self.wave_phase = WavePhase::Spawning { remaining: count };
        }
    }

    fn spawn_regular_enemy(&mut self) {
        let kind = EnemyKind::REGULAR
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(EnemyKind::Runner);
        let base = ENEMY_SPAWN_POINTS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(ENEMY_SPAWN_POINTS[0]);
        let (x, y) = self.find_enemy_spawn(base, kind.profile().size);
        let enemy = self.make_enemy(kind, x, y);
        self.world.enemies.push(enemy);
    }

    fn make_enemy(&mut self, kind: EnemyKind, x: f32, y: f32) -> Enemy {
        let id = self.next_enemy_id;
        self.next_enemy_id = self.next_enemy_id.wrapping_add(1);
        Enemy::new(id, kind, x, y)
    }

    fn is_safe_spawn(&self, x: f32, y: f32, size: f32) -> bool {
        let (min_x, min_y, max_x, max_y) = SPAWN_BOUNDS;
        x > min_x
            && x < max_x
            && y > min_y
            && y < max_y
            && !self.hits_wall(&Rect::centered(x, y, size + SPAWN_MARGIN))
    }

    /// Random wall-free point around `base`, or `base` itself when none is found.
    pub(crate) fn find_enemy_spawn(&mut self, base: (f32, f32), size: f32) -> (f32, f32) {
        for (min, max) in SPAWN_RINGS {
            for _ in 0..SPAWN_ATTEMPTS_PER_RING {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                let reach = self.rng.gen_range(min..max);
                let x = base.0 + angle.cos() * reach;
                let y = base.1 + angle.sin() * reach;
                if self.is_safe_spawn(x, y, size) {
                    return (x, y);
                }
            }
        }

        warn!(
            "No safe enemy spawn around ({:.0}, {:.0}), using base point",
            base.0, base.1
        );
        base
    }
}
