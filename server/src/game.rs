//! Authoritative world simulation
//!
//! [`GameState`] is owned by the game loop task and is the only thing that
//! mutates the world. One call to [`GameState::step`] advances the match by a
//! single tick, running every phase in a fixed order:
//!
//! 1. wave spawner (`waves`)
//! 2. respawn countdowns and game-over
//! 3. player movement
//! 4. weapon fire
//! 5. bullets
//! 6. pickups and loot boxes
//! 7. mines
//! 8. enemy AI (`ai`)
//! 9. destroyed wall cleanup

use crate::config::ServerConfig;
use crate::pathfinding::NavGrid;
use crate::waves::WavePhase;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::geometry::{distance, splash_damage, Rect};
use shared::weapons::DROPPABLE_WEAPONS;
use shared::world::map_walls;
use shared::{
    Bullet, EnemyKind, LootBox, Mine, Owner, Packet, Pickup, PickupKind, PlayerInput,
    WeaponBehavior, WeaponId, WorldState, ARMOR_PICKUP_AMOUNT, DEFAULT_SPAWN,
    HEALTH_PICKUP_AMOUNT, PLAYER_MOVE_MULTIPLIER, PLAYER_SIZE, TICK_RATE,
};
use std::collections::HashMap;

/// Placement attempts around the default spawn before giving up.
const PLAYER_SPAWN_ATTEMPTS: u32 = 50;
/// Search radius grows by this much per failed attempt.
const PLAYER_SPAWN_STEP: f32 = 10.0;

const DIAGONAL_FACTOR: f32 = 0.7071;

const HEALTH_DROP_CHANCE: f32 = 0.2;
const ARMOR_DROP_CHANCE: f32 = 0.3;

pub struct GameState {
    pub tick: u64,
    pub(crate) world: WorldState,
    pub(crate) inputs: HashMap<u32, PlayerInput>,
    pub(crate) wave_phase: WavePhase,
    pub(crate) rng: StdRng,
    pub(crate) next_enemy_id: u32,
    pub(crate) nav: NavGrid,
    tick_rate: u32,
    wall_revision: u64,
    nav_revision: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self::build(StdRng::from_entropy(), TICK_RATE)
    }

    /// Deterministic simulation for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed), TICK_RATE)
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(rng, config.tick_rate.max(1))
    }

    fn build(rng: StdRng, tick_rate: u32) -> Self {
        let world = WorldState::new();
        let nav = NavGrid::from_walls(&world.walls);
        Self {
            tick: 0,
            world,
            inputs: HashMap::new(),
            wave_phase: WavePhase::Idle,
            rng,
            next_enemy_id: 0,
            nav,
            tick_rate,
            wall_revision: 0,
            nav_revision: 0,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn wave_phase(&self) -> WavePhase {
        self.wave_phase
    }

    /// Seconds simulated by one tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Simulation clock in milliseconds, derived from the tick counter.
    pub fn now_ms(&self) -> u64 {
        self.tick * 1000 / u64::from(self.tick_rate)
    }

    pub fn snapshot(&self) -> Packet {
        Packet::GameState {
            tick: self.tick,
            world: self.world.clone(),
        }
    }

    /// Creates a player at a wall-free spot near the default spawn.
    pub fn add_player(&mut self, player_id: u32) -> (f32, f32) {
        let (x, y) = self.find_player_spawn();
        self.world
            .players
            .insert(player_id, shared::Player::new(player_id, x, y));
        self.inputs.insert(player_id, PlayerInput::neutral(x, y));
        info!("Added player {} at ({:.0}, {:.0})", player_id, x, y);
        (x, y)
    }

    pub fn remove_player(&mut self, player_id: u32) {
        self.world.players.remove(&player_id);
        self.inputs.remove(&player_id);
        info!("Removed player {}", player_id);
    }

    /// Latest input wins. Ignored for unknown or dead players.
    pub fn set_input(&mut self, player_id: u32, input: PlayerInput) -> bool {
        match self.world.players.get(&player_id) {
            Some(player) if !player.dead => {
                self.inputs.insert(player_id, input.sanitized());
                true
            }
            _ => false,
        }
    }

    pub fn input_for(&self, player_id: u32) -> Option<&PlayerInput> {
        self.inputs.get(&player_id)
    }

    /// Returns the applied index, or None when the index is out of range.
    pub fn switch_weapon(&mut self, player_id: u32, index: usize) -> Option<usize> {
        let player = self.world.players.get_mut(&player_id)?;
        if player.switch_weapon(index) {
            Some(index)
        } else {
            None
        }
    }

    /// Starts the match over for everyone currently connected.
    pub fn restart(&mut self) {
        for player in self.world.players.values_mut() {
            player.respawn(DEFAULT_SPAWN.0, DEFAULT_SPAWN.1);
        }
        for (id, player) in &self.world.players {
            self.inputs
                .insert(*id, PlayerInput::neutral(player.x, player.y));
        }

        self.world.enemies.clear();
        self.world.bullets.clear();
        self.world.mines.clear();
        self.world.pickups.clear();
        self.world.lootboxes.clear();
        self.world.walls = map_walls();
        self.world.scores.clear();
        self.world.wave = 1;
        self.world.wave_cooldown = 0.0;
        self.world.game_over = false;
        self.wave_phase = WavePhase::Idle;
        self.walls_changed();

        info!("Game restarted with {} players", self.world.players.len());
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        let dt = self.dt();
        let now_ms = self.now_ms();

        self.update_waves(dt);
        self.update_lives(dt);
        self.apply_movement();
        self.fire_weapons(now_ms);
        self.update_bullets();
        self.collect_pickups();
        self.update_mines(dt);
        self.update_enemies(dt, now_ms);
        self.cleanup_walls();

        self.tick += 1;
        if self.tick % u64::from(self.tick_rate) == 0 {
            debug!(
                "Tick {}: {} players, {} enemies, {} bullets, wave {}",
                self.tick,
                self.world.players.len(),
                self.world.enemies.len(),
                self.world.bullets.len(),
                self.world.wave
            );
        }
    }

    pub(crate) fn walls_changed(&mut self) {
        self.wall_revision += 1;
    }

    /// Rebuilds the navigation grid if the wall set changed since the last build.
    pub(crate) fn refresh_nav_grid(&mut self) {
        if self.nav_revision != self.wall_revision {
            self.nav = NavGrid::from_walls(&self.world.walls);
            self.nav_revision = self.wall_revision;
        }
    }

    pub(crate) fn hits_wall(&self, area: &Rect) -> bool {
        self.world.walls.iter().any(|w| w.rect.intersects(area))
    }

    fn find_player_spawn(&mut self) -> (f32, f32) {
        let (base_x, base_y) = DEFAULT_SPAWN;
        if !self.hits_wall(&Rect::centered(base_x, base_y, PLAYER_SIZE)) {
            return DEFAULT_SPAWN;
        }

        for attempt in 1..=PLAYER_SPAWN_ATTEMPTS {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let reach = self
                .rng
                .gen_range(50.0..=50.0 + PLAYER_SPAWN_STEP * attempt as f32);
            let x = base_x + angle.cos() * reach;
            let y = base_y + angle.sin() * reach;
            if !self.hits_wall(&Rect::centered(x, y, PLAYER_SIZE)) {
                return (x, y);
            }
        }

        warn!(
            "No free spawn found after {} attempts, using default spawn",
            PLAYER_SPAWN_ATTEMPTS
        );
        DEFAULT_SPAWN
    }

    fn update_lives(&mut self, dt: f32) {
        for player in self.world.players.values_mut() {
            if player.dead && player.respawn_timer > 0.0 {
                player.respawn_timer -= dt;
                if player.respawn_timer <= 0.0 {
                    player.respawn(DEFAULT_SPAWN.0, DEFAULT_SPAWN.1);
                    info!("Player {} respawned", player.id);
                }
            }
        }

        let game_over = self.world.all_players_dead();
        if game_over && !self.world.game_over {
            info!("All players are dead, game over at wave {}", self.world.wave);
        }
        self.world.game_over = game_over;
    }

    fn current_input(&self, player_id: u32) -> Option<PlayerInput> {
        let player = self.world.players.get(&player_id)?;
        Some(
            self.inputs
                .get(&player_id)
                .copied()
                .unwrap_or_else(|| PlayerInput::neutral(player.x, player.y)),
        )
    }

    fn apply_movement(&mut self) {
        let ids: Vec<u32> = self.world.players.keys().copied().collect();
        for id in ids {
            let input = match self.current_input(id) {
                Some(input) => input,
                None => continue,
            };

            let (dx, dy) = if input.dx != 0.0 && input.dy != 0.0 {
                (input.dx * DIAGONAL_FACTOR, input.dy * DIAGONAL_FACTOR)
            } else {
                (input.dx, input.dy)
            };

            let target = match self.world.players.get(&id) {
                Some(player) if !player.dead => {
                    let step = player.speed * PLAYER_MOVE_MULTIPLIER;
                    (player.x + dx * step, player.y + dy * step)
                }
                _ => continue,
            };
            let blocked = self.hits_wall(&Rect::centered(target.0, target.1, PLAYER_SIZE));

            if let Some(player) = self.world.players.get_mut(&id) {
                if !blocked {
                    player.x = target.0;
                    player.y = target.1;
                }
                player.angle = input.angle;
            }
        }
    }

    fn fire_weapons(&mut self, now_ms: u64) {
        let ids: Vec<u32> = self.world.players.keys().copied().collect();
        for id in ids {
            if let Some(input) = self.current_input(id) {
                if input.shoot {
                    self.fire_weapon(id, &input, now_ms);
                }
            }
        }
    }

    fn fire_weapon(&mut self, player_id: u32, input: &PlayerInput, now_ms: u64) {
        let (weapon, x, y, facing) = match self.world.players.get(&player_id) {
            Some(p) if !p.dead && p.can_fire(now_ms) => (p.current_weapon(), p.x, p.y, p.angle),
            _ => return,
        };
        let owner = Owner::Player(player_id);

        let fired = match weapon.behavior {
            WeaponBehavior::WallSpawner { size, health } => {
                self.place_wall(input.mouse_x, input.mouse_y, size, health)
            }
            WeaponBehavior::MinePlacer => {
                self.place_mine(input.mouse_x, input.mouse_y, owner, weapon.damage)
            }
            WeaponBehavior::Projectile
            | WeaponBehavior::Spread { .. }
            | WeaponBehavior::Explosive { .. } => {
                for angle in weapon.shot_angles(facing) {
                    self.world
                        .bullets
                        .push(Bullet::from_weapon(x, y, angle, owner, weapon));
                }
                true
            }
        };

        if fired {
            if let Some(player) = self.world.players.get_mut(&player_id) {
                player.last_shot_ms = Some(now_ms);
                player.consume_ammo(weapon.id);
            }
        }
    }

    fn place_wall(&mut self, x: f32, y: f32, size: f32, health: f32) -> bool {
        let wall = shared::Wall::player_placed(x, y, size, health);
        if self.hits_wall(&wall.rect) {
            debug!("Rejected wall placement at ({:.0}, {:.0})", x, y);
            return false;
        }
        self.world.walls.push(wall);
        self.walls_changed();
        true
    }

    fn place_mine(&mut self, x: f32, y: f32, owner: Owner, damage: f32) -> bool {
        if self.hits_wall(&Mine::footprint(x, y)) {
            debug!("Rejected mine placement at ({:.0}, {:.0})", x, y);
            return false;
        }
        self.world.mines.push(Mine::new(x, y, owner, damage));
        true
    }

    fn update_bullets(&mut self) {
        let bullets = std::mem::take(&mut self.world.bullets);
        let mut remaining = Vec::with_capacity(bullets.len());

        for mut bullet in bullets {
            bullet.advance();
            if bullet.is_expired() {
                continue;
            }
            if self.bullet_hits_wall(&bullet)
                || self.bullet_hits_enemy(&bullet)
                || self.bullet_hits_player(&bullet)
            {
                continue;
            }
            remaining.push(bullet);
        }

        self.world.bullets = remaining;
    }

    fn bullet_hits_wall(&mut self, bullet: &Bullet) -> bool {
        match self
            .world
            .walls
            .iter_mut()
            .find(|w| w.rect.contains_point(bullet.x, bullet.y))
        {
            Some(wall) => {
                wall.apply_damage(bullet.damage);
                true
            }
            None => false,
        }
    }

    fn bullet_hits_enemy(&mut self, bullet: &Bullet) -> bool {
        let owner_id = match bullet.owner {
            Owner::Player(id) => id,
            Owner::Enemy => return false,
        };
        let index = match self
            .world
            .enemies
            .iter()
            .position(|e| distance(bullet.x, bullet.y, e.x, e.y) < e.size())
        {
            Some(index) => index,
            None => return false,
        };

        let hit_id = self.world.enemies[index].id;
        self.world.enemies[index].health -= bullet.damage;
        if self.world.enemies[index].is_dead() {
            let enemy = self.world.enemies.remove(index);
            self.world.award(owner_id, enemy.kind.bullet_kill_points());
            info!(
                "Player {} killed {:?} {} (+{})",
                owner_id,
                enemy.kind,
                enemy.id,
                enemy.kind.bullet_kill_points()
            );
            self.drop_loot(enemy.kind, enemy.x, enemy.y);
        }

        if let Some(radius) = bullet.explosion_radius {
            for other in self.world.enemies.iter_mut().filter(|e| e.id != hit_id) {
                let dist = distance(bullet.x, bullet.y, other.x, other.y);
                if let Some(damage) = splash_damage(bullet.damage, dist, radius) {
                    other.health -= damage;
                }
            }
            self.world.enemies.retain(|e| !e.is_dead());
        }
        true
    }

    fn bullet_hits_player(&mut self, bullet: &Bullet) -> bool {
        let target = self.world.players.values_mut().find(|p| {
            !p.dead
                && bullet.owner != Owner::Player(p.id)
                && distance(bullet.x, bullet.y, p.x, p.y) < PLAYER_SIZE
        });

        match target {
            Some(player) => {
                if player.take_damage(bullet.damage) {
                    info!("Player {} was shot down", player.id);
                }
                true
            }
            None => false,
        }
    }

    /// Rolls the drop for a killed enemy at `(x, y)`.
    pub(crate) fn drop_loot(&mut self, kind: EnemyKind, x: f32, y: f32) {
        if kind == EnemyKind::Boss {
            self.world
                .lootboxes
                .push(LootBox::new(x, y, WeaponId::Bazooka));
            return;
        }

        let roll: f32 = self.rng.gen();
        if roll < HEALTH_DROP_CHANCE {
            self.world
                .pickups
                .push(Pickup::new(x, y, PickupKind::Health, HEALTH_PICKUP_AMOUNT));
        } else if roll < ARMOR_DROP_CHANCE {
            self.world
                .pickups
                .push(Pickup::new(x, y, PickupKind::Armor, ARMOR_PICKUP_AMOUNT));
        } else {
            let weapon = DROPPABLE_WEAPONS
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(WeaponId::Smg);
            self.world.lootboxes.push(LootBox::new(x, y, weapon));
        }
    }

    fn collect_pickups(&mut self) {
        let WorldState {
            players,
            pickups,
            lootboxes,
            ..
        } = &mut self.world;

        for player in players.values_mut().filter(|p| !p.dead) {
            pickups.retain(|pickup| {
                if distance(player.x, player.y, pickup.x, pickup.y) >= PLAYER_SIZE + pickup.size() {
                    return true;
                }
                match pickup.kind {
                    PickupKind::Health => player.add_health(pickup.value),
                    PickupKind::Armor => player.add_armor(pickup.value),
                }
                false
            });

            lootboxes.retain(|lootbox| {
                if distance(player.x, player.y, lootbox.x, lootbox.y) >= PLAYER_SIZE + lootbox.size()
                {
                    return true;
                }
                player.add_weapon(lootbox.weapon);
                debug!("Player {} picked up {}", player.id, lootbox.weapon.name());
                false
            });
        }
    }

    fn update_mines(&mut self, dt: f32) {
        let mut mines = std::mem::take(&mut self.world.mines);
        let mut detonated = Vec::new();

        mines.retain_mut(|mine| {
            if !mine.active {
                let player_contact = self
                    .world
                    .living_players()
                    .any(|p| mine.touches(p.x, p.y, PLAYER_SIZE));
                let enemy_contact = self
                    .world
                    .enemies
                    .iter()
                    .any(|e| mine.touches(e.x, e.y, e.size()));
                if player_contact || enemy_contact {
                    mine.arm();
                }
            }

            if mine.tick_fuse(dt) {
                detonated.push(mine.clone());
                false
            } else {
                true
            }
        });

        // Mines placed by enemies this tick land after the survivors.
        mines.append(&mut self.world.mines);
        self.world.mines = mines;

        for mine in detonated {
            self.detonate_mine(&mine);
        }
    }

    fn detonate_mine(&mut self, mine: &Mine) {
        for player in self.world.players.values_mut().filter(|p| !p.dead) {
            let dist = distance(mine.x, mine.y, player.x, player.y);
            if let Some(damage) = splash_damage(mine.damage, dist, mine.explosion_radius) {
                if player.take_damage(damage) {
                    info!("Player {} was killed by a mine", player.id);
                }
            }
        }

        let mut killed = Vec::new();
        self.world.enemies.retain_mut(|enemy| {
            let dist = distance(mine.x, mine.y, enemy.x, enemy.y);
            if let Some(damage) = splash_damage(mine.damage, dist, mine.explosion_radius) {
                enemy.health -= damage;
            }
            if enemy.is_dead() {
                killed.push((enemy.kind, enemy.x, enemy.y));
                false
            } else {
                true
            }
        });

        for (kind, x, y) in killed {
            if let Some(owner_id) = mine.owner.player_id() {
                self.world.award(owner_id, kind.mine_kill_points());
            }
            self.drop_loot(kind, x, y);
        }
    }

    fn cleanup_walls(&mut self) {
        let before = self.world.walls.len();
        self.world.walls.retain(|w| !w.is_destroyed());
        if self.world.walls.len() != before {
            self.walls_changed();
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Enemy, Player, PLAYER_MAX_ARMOR, PLAYER_MAX_HEALTH};

    /// Seeded state whose wave spawner stays idle for the duration of a test.
    fn quiet_state() -> GameState {
        let mut state = GameState::with_seed(7);
        state.world.wave_cooldown = 10_000.0;
        state
    }

    fn shoot_at(x: f32, y: f32, angle: f32) -> PlayerInput {
        PlayerInput {
            dx: 0.0,
            dy: 0.0,
            angle,
            shoot: true,
            mouse_x: x,
            mouse_y: y,
        }
    }

    #[test]
    fn test_add_player_uses_default_spawn() {
        let mut state = quiet_state();
        assert_eq!(state.add_player(0), DEFAULT_SPAWN);
        let player = &state.world.players[&0];
        assert_eq!(player.weapons, vec![WeaponId::Pistol]);
        assert_eq!(state.input_for(0), Some(&PlayerInput::neutral(400.0, 300.0)));
    }

    #[test]
    fn test_blocked_default_spawn_searches_outward() {
        let mut state = quiet_state();
        state
            .world
            .walls
            .push(shared::Wall::fixed(380.0, 280.0, 40.0, 40.0));

        let (x, y) = state.add_player(0);
        assert_ne!((x, y), DEFAULT_SPAWN);
        assert!(!state.hits_wall(&Rect::centered(x, y, PLAYER_SIZE)));
    }

    #[test]
    fn test_smg_fire_consumes_ammo_and_respects_rate() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::Smg);
            assert!(player.switch_weapon(1));
        }
        state.set_input(0, shoot_at(500.0, 300.0, 0.0));

        state.step();
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::Smg), Some(149));
        assert_eq!(state.world.bullets.len(), 1);

        // 16 ms later: well inside the 100 ms interval.
        state.step();
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::Smg), Some(149));
        assert_eq!(state.world.bullets.len(), 1);
    }

    #[test]
    fn test_pistol_never_runs_dry() {
        let mut state = quiet_state();
        state.add_player(0);
        state.set_input(0, shoot_at(500.0, 300.0, 0.0));

        for _ in 0..120 {
            state.step();
        }
        let player = &state.world.players[&0];
        assert_eq!(player.ammo_for(WeaponId::Pistol), None);
        assert!(player.can_fire(u64::MAX));
    }

    #[test]
    fn test_shotgun_fires_three_pellets_for_one_shell() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::Shotgun);
            player.switch_weapon(1);
        }
        state.set_input(0, shoot_at(500.0, 300.0, 0.0));
        state.step();

        assert_eq!(state.world.bullets.len(), 3);
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::Shotgun), Some(49));
    }

    #[test]
    fn test_bullet_removed_after_exceeding_range() {
        let mut state = quiet_state();
        state.world.bullets.push(Bullet::from_weapon(
            1500.0,
            500.0,
            0.0,
            Owner::Player(9),
            WeaponId::Shotgun.stats(),
        ));

        // Twelve pixels per tick against a 180 pixel range.
        for _ in 0..15 {
            state.step();
        }
        assert_eq!(state.world.bullets.len(), 1);
        assert!(state.world.bullets[0].lifetime > 0);

        state.step();
        assert!(state.world.bullets.is_empty());
    }

    #[test]
    fn test_enemy_kill_awards_points_and_drops_loot() {
        let mut state = quiet_state();
        state.add_player(0);
        state
            .world
            .enemies
            .push(Enemy::new(50, EnemyKind::Runner, 1500.0, 500.0));

        for damage in [25.0, 25.0, 60.0] {
            let enemy = &state.world.enemies[0];
            let mut bullet = Bullet::from_weapon(
                enemy.x - 10.0,
                enemy.y,
                0.0,
                Owner::Player(0),
                WeaponId::Pistol.stats(),
            );
            bullet.damage = damage;
            state.world.bullets.push(bullet);
            state.step();
        }

        assert!(state.world.enemies.is_empty());
        assert_eq!(state.world.score(0), 100);
        assert_eq!(
            state.world.pickups.len() + state.world.lootboxes.len(),
            1
        );
    }

    #[test]
    fn test_boss_always_drops_bazooka() {
        let mut state = quiet_state();
        for _ in 0..20 {
            state.drop_loot(EnemyKind::Boss, 10.0, 10.0);
        }
        assert!(state.world.pickups.is_empty());
        assert!(state
            .world
            .lootboxes
            .iter()
            .all(|l| l.weapon == WeaponId::Bazooka));
    }

    #[test]
    fn test_bazooka_splash_hurts_nearby_enemies() {
        let mut state = quiet_state();
        state
            .world
            .enemies
            .push(Enemy::new(1, EnemyKind::Tank, 1500.0, 500.0));
        state
            .world
            .enemies
            .push(Enemy::new(2, EnemyKind::Tank, 1530.0, 500.0));
        state
            .world
            .enemies
            .push(Enemy::new(3, EnemyKind::Tank, 1700.0, 500.0));

        state.world.bullets.push(Bullet::from_weapon(
            1492.0,
            500.0,
            0.0,
            Owner::Player(0),
            WeaponId::Bazooka.stats(),
        ));
        state.world.players.insert(0, Player::new(0, 400.0, 300.0));
        state.world.players.get_mut(&0).unwrap().kill();
        state.step();

        let health = |id: u32| {
            state
                .world
                .enemies
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.health)
        };
        // Direct hit lands at x = 1500.
        assert_eq!(health(1), Some(100.0));
        assert_eq!(health(2), Some(400.0 - 150.0));
        assert_eq!(health(3), Some(400.0));
    }

    #[test]
    fn test_splash_kill_gives_no_points() {
        let mut state = quiet_state();
        state
            .world
            .enemies
            .push(Enemy::new(1, EnemyKind::Tank, 1500.0, 500.0));
        state
            .world
            .enemies
            .push(Enemy::new(2, EnemyKind::Miner, 1510.0, 500.0));
        state.world.bullets.push(Bullet::from_weapon(
            1492.0,
            500.0,
            0.0,
            Owner::Player(0),
            WeaponId::Bazooka.stats(),
        ));
        state.step();

        assert!(state.world.enemies.iter().all(|e| e.id == 1));
        assert_eq!(state.world.score(0), 0);
    }

    #[test]
    fn test_enemy_bullet_hits_player_through_armor() {
        let mut state = quiet_state();
        state.add_player(0);
        state.world.players.get_mut(&0).unwrap().add_armor(10.0);
        state
            .world
            .bullets
            .push(Bullet::enemy_shot(380.0, 300.0, 0.0, 15.0, 8.0));
        state.step();

        let player = &state.world.players[&0];
        assert_eq!(player.armor, 0.0);
        assert_eq!(player.health, PLAYER_MAX_HEALTH - 5.0);
        assert!(state.world.bullets.is_empty());
    }

    #[test]
    fn test_own_bullets_pass_through_owner() {
        let mut state = quiet_state();
        state.add_player(0);
        state.world.bullets.push(Bullet::from_weapon(
            390.0,
            300.0,
            0.0,
            Owner::Player(0),
            WeaponId::Pistol.stats(),
        ));
        state.step();
        assert_eq!(state.world.players[&0].health, PLAYER_MAX_HEALTH);
        assert_eq!(state.world.bullets.len(), 1);
    }

    #[test]
    fn test_bullet_damages_placed_wall() {
        let mut state = quiet_state();
        state
            .world
            .walls
            .push(shared::Wall::player_placed(1520.0, 500.0, 40.0, 100.0));
        state.walls_changed();
        state.world.bullets.push(Bullet::from_weapon(
            1490.0,
            500.0,
            0.0,
            Owner::Player(0),
            WeaponId::Pistol.stats(),
        ));
        for _ in 0..3 {
            state.step();
        }
        let wall = state.world.walls.last().unwrap();
        assert!(wall.player_placed);
        assert_eq!(wall.health, 75.0);
        assert!(state.world.bullets.is_empty());
    }

    #[test]
    fn test_mine_on_wall_is_rejected_without_ammo_use() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::MinePlacer);
            player.switch_weapon(1);
        }
        // Straddles the left border wall.
        state.set_input(0, shoot_at(25.0, 300.0, 180.0));
        state.step();

        assert!(state.world.mines.is_empty());
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::MinePlacer), Some(20));
        assert_eq!(state.world.players[&0].last_shot_ms, None);
    }

    #[test]
    fn test_mine_placement_and_detonation() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::MinePlacer);
            player.switch_weapon(1);
        }
        state.set_input(0, shoot_at(650.0, 300.0, 0.0));
        state.step();
        assert_eq!(state.world.mines.len(), 1);
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::MinePlacer), Some(19));
        state.set_input(0, PlayerInput::neutral(400.0, 300.0));

        // A shooter with the player in range holds still on top of the mine.
        state
            .world
            .enemies
            .push(Enemy::new(1, EnemyKind::Shooter, 650.0, 300.0));
        state.step();
        assert!(state.world.mines[0].active);

        for _ in 0..60 {
            state.step();
        }
        assert!(state.world.mines.is_empty());
        assert!(state.world.enemies.is_empty());
        assert_eq!(state.world.score(0), EnemyKind::Shooter.mine_kill_points());
    }

    #[test]
    fn test_wall_spawner_places_and_rejects_overlap() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::WallSpawner);
            player.switch_weapon(1);
        }
        let walls_before = state.world.walls.len();
        state.set_input(0, shoot_at(600.0, 300.0, 0.0));
        state.step();
        assert_eq!(state.world.walls.len(), walls_before + 1);
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::WallSpawner), Some(19));

        // Same spot after the cooldown: overlaps the new wall.
        for _ in 0..70 {
            state.step();
        }
        assert_eq!(state.world.walls.len(), walls_before + 1);
        assert_eq!(state.world.players[&0].ammo_for(WeaponId::WallSpawner), Some(19));
    }

    #[test]
    fn test_pickups_are_collected_on_contact() {
        let mut state = quiet_state();
        state.add_player(0);
        state.world.players.get_mut(&0).unwrap().health = 100.0;
        state
            .world
            .pickups
            .push(Pickup::new(420.0, 300.0, PickupKind::Health, 50.0));
        state
            .world
            .pickups
            .push(Pickup::new(400.0, 330.0, PickupKind::Armor, 1000.0));
        state
            .world
            .lootboxes
            .push(LootBox::new(380.0, 300.0, WeaponId::Shotgun));
        state
            .world
            .pickups
            .push(Pickup::new(900.0, 300.0, PickupKind::Health, 50.0));
        state.step();

        let player = &state.world.players[&0];
        assert_eq!(player.health, 150.0);
        assert_eq!(player.armor, PLAYER_MAX_ARMOR);
        assert!(player.weapons.contains(&WeaponId::Shotgun));
        assert_eq!(state.world.pickups.len(), 1);
        assert!(state.world.lootboxes.is_empty());
    }

    #[test]
    fn test_movement_diagonal_and_wall_block() {
        let mut state = quiet_state();
        state.add_player(0);
        state.set_input(
            0,
            PlayerInput {
                dx: 1.0,
                dy: 1.0,
                angle: 45.0,
                shoot: false,
                mouse_x: 0.0,
                mouse_y: 0.0,
            },
        );
        state.step();
        let player = &state.world.players[&0];
        assert_approx_eq!(player.x, 400.0 + 10.0 * DIAGONAL_FACTOR, 1e-3);
        assert_approx_eq!(player.y, 300.0 + 10.0 * DIAGONAL_FACTOR, 1e-3);
        assert_eq!(player.angle, 45.0);

        // Pinned against the top border: the move is rejected, facing still turns.
        state.world.players.get_mut(&0).unwrap().y = 55.0;
        state.set_input(
            0,
            PlayerInput {
                dx: 0.0,
                dy: -1.0,
                angle: -90.0,
                shoot: false,
                mouse_x: 0.0,
                mouse_y: 0.0,
            },
        );
        state.step();
        let player = &state.world.players[&0];
        assert_eq!(player.y, 55.0);
        assert_eq!(player.angle, -90.0);
    }

    #[test]
    fn test_neutral_input_is_idempotent() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::Smg);
        }
        let before = state.world.players[&0].clone();
        for _ in 0..300 {
            state.step();
        }
        let after = &state.world.players[&0];
        assert_eq!((after.x, after.y), (before.x, before.y));
        assert_eq!(after.ammo, before.ammo);
    }

    #[test]
    fn test_dead_player_input_ignored() {
        let mut state = quiet_state();
        state.add_player(0);
        state.world.players.get_mut(&0).unwrap().kill();
        assert!(!state.set_input(0, shoot_at(0.0, 0.0, 0.0)));
        assert!(!state.input_for(0).unwrap().shoot);
    }

    #[test]
    fn test_game_over_then_restart() {
        let mut state = quiet_state();
        state.add_player(0);
        state.add_player(1);
        state.world.award(0, 500);
        state.world.wave = 4;
        for player in state.world.players.values_mut() {
            player.add_weapon(WeaponId::Bazooka);
            player.take_damage(10_000.0);
        }
        state.step();
        assert!(state.world.game_over);

        state.restart();
        assert_eq!(state.world.wave, 1);
        assert_eq!(state.world.wave_cooldown, 0.0);
        assert!(state.world.scores.is_empty());
        assert!(!state.world.game_over);
        assert_eq!(state.wave_phase(), WavePhase::Idle);
        for player in state.world.players.values() {
            assert!(!player.dead);
            assert_eq!(player.health, PLAYER_MAX_HEALTH);
            assert_eq!(player.weapons, vec![WeaponId::Pistol]);
            assert_eq!((player.x, player.y), DEFAULT_SPAWN);
        }
        assert_eq!(state.world.walls.len(), map_walls().len());
    }

    #[test]
    fn test_dead_player_respawns_after_timer() {
        let mut state = quiet_state();
        state.add_player(0);
        state.add_player(1);
        state.world.players.get_mut(&0).unwrap().kill();

        for _ in 0..(5 * 60 - 1) {
            state.step();
        }
        assert!(state.world.players[&0].dead);
        assert!(!state.world.game_over);

        for _ in 0..5 {
            state.step();
        }
        assert!(!state.world.players[&0].dead);
        assert_eq!(state.world.players[&0].health, PLAYER_MAX_HEALTH);
    }

    #[test]
    fn test_switch_weapon_out_of_range_is_ignored() {
        let mut state = quiet_state();
        state.add_player(0);
        {
            let player = state.world.players.get_mut(&0).unwrap();
            player.add_weapon(WeaponId::Smg);
            player.add_weapon(WeaponId::Shotgun);
        }
        assert_eq!(state.switch_weapon(0, 5), None);
        assert_eq!(state.world.players[&0].selected_weapon_index, 0);
        assert_eq!(state.switch_weapon(0, 2), Some(2));
        assert_eq!(state.switch_weapon(42, 0), None);
    }

    #[test]
    fn test_remove_player_drops_input() {
        let mut state = quiet_state();
        state.add_player(3);
        state.remove_player(3);
        assert!(state.world.players.is_empty());
        assert!(state.input_for(3).is_none());
    }

    #[test]
    fn test_simulation_clock() {
        let mut state = quiet_state();
        assert_eq!(state.now_ms(), 0);
        for _ in 0..60 {
            state.step();
        }
        assert_eq!(state.now_ms(), 1000);
    }

    #[test]
    fn test_invariants_hold_over_long_run() {
        let mut state = GameState::with_seed(99);
        state.add_player(0);
        state.add_player(1);
        state.set_input(0, shoot_at(800.0, 300.0, 0.0));

        for _ in 0..60 * 60 {
            state.step();
            assert!(state.world.wave_cooldown >= 0.0);
            // Deaths later in the tick are picked up by the next one.
            assert!(!state.world.game_over || state.world.all_players_dead());
            for wall in &state.world.walls {
                assert!(wall.health > 0.0);
            }
            for player in state.world.players.values() {
                assert!((0.0..=PLAYER_MAX_HEALTH).contains(&player.health));
                assert!((0.0..=PLAYER_MAX_ARMOR).contains(&player.armor));
                for (weapon, rounds) in &player.ammo {
                    assert!(*rounds <= weapon.stats().ammo_capacity.unwrap_or(u32::MAX));
                }
            }
            if state.world.wave % 5 != 0 {
                assert!(state.world.enemies.len() <= shared::MAX_ALIVE_ENEMIES);
            }
        }
    }
}
