//! Entity records that make up the world state.
//!
//! These are plain data with small invariant-keeping helpers (damage
//! absorption, ammo accounting, respawn). All behaviour that involves more than
//! one entity lives in the server's simulation.

use crate::geometry::Rect;
use crate::weapons::{Weapon, WeaponId};
use crate::{
    BULLET_LIFETIME_TICKS, ENEMY_BULLET_RANGE, LOOTBOX_SIZE, MINE_EXPLOSION_RADIUS,
    MINE_FUSE_SECONDS, MINE_SIZE, PICKUP_SIZE, PLAYER_MAX_ARMOR, PLAYER_MAX_HEALTH, PLAYER_SIZE,
    PLAYER_SPEED, RESPAWN_SECONDS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who fired a bullet or placed a mine.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Player(u32),
    Enemy,
}

impl Owner {
    pub fn player_id(self) -> Option<u32> {
        match self {
            Owner::Player(id) => Some(id),
            Owner::Enemy => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Facing, in degrees.
    pub angle: f32,
    pub health: f32,
    pub armor: f32,
    pub speed: f32,
    pub weapons: Vec<WeaponId>,
    pub selected_weapon_index: usize,
    /// Remaining rounds for every owned weapon with a finite capacity.
    pub ammo: BTreeMap<WeaponId, u32>,
    pub dead: bool,
    /// Seconds until respawn while dead.
    pub respawn_timer: f32,
    /// Simulation time of the last accepted trigger pull.
    pub last_shot_ms: Option<u64>,
}

impl Player {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        let mut player = Self {
            id,
            x,
            y,
            angle: 0.0,
            health: PLAYER_MAX_HEALTH,
            armor: 0.0,
            speed: PLAYER_SPEED,
            weapons: Vec::new(),
            selected_weapon_index: 0,
            ammo: BTreeMap::new(),
            dead: false,
            respawn_timer: 0.0,
            last_shot_ms: None,
        };
        player.add_weapon(WeaponId::Pistol);
        player
    }

    pub fn bounds(&self) -> Rect {
        Rect::centered(self.x, self.y, PLAYER_SIZE)
    }

    pub fn current_weapon(&self) -> &'static Weapon {
        self.weapons
            .get(self.selected_weapon_index)
            .copied()
            .unwrap_or(WeaponId::Pistol)
            .stats()
    }

    /// Remaining rounds, `None` when the weapon is unlimited.
    pub fn ammo_for(&self, weapon: WeaponId) -> Option<u32> {
        if weapon.stats().is_unlimited() {
            None
        } else {
            Some(self.ammo.get(&weapon).copied().unwrap_or(0))
        }
    }

    pub fn has_ammo(&self, weapon: WeaponId) -> bool {
        self.ammo_for(weapon).map_or(true, |rounds| rounds > 0)
    }

    pub fn consume_ammo(&mut self, weapon: WeaponId) {
        if let Some(rounds) = self.ammo.get_mut(&weapon) {
            *rounds = rounds.saturating_sub(1);
        }
    }

    /// Grants a weapon (once) and tops its ammo up to capacity.
    pub fn add_weapon(&mut self, weapon: WeaponId) {
        if !self.weapons.contains(&weapon) {
            self.weapons.push(weapon);
        }
        if let Some(capacity) = weapon.stats().ammo_capacity {
            self.ammo.insert(weapon, capacity);
        }
    }

    /// Returns false and leaves the selection alone when `index` is out of bounds.
    pub fn switch_weapon(&mut self, index: usize) -> bool {
        if index < self.weapons.len() {
            self.selected_weapon_index = index;
            true
        } else {
            false
        }
    }

    /// Trigger and ammo gate for the selected weapon at simulation time `now_ms`.
    pub fn can_fire(&self, now_ms: u64) -> bool {
        let weapon = self.current_weapon();
        let rested = self
            .last_shot_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > weapon.fire_rate_ms);
        rested && self.has_ammo(weapon.id)
    }

    /// Armor soaks damage first, the rest comes off health. Returns true when
    /// this hit killed the player.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.dead || amount <= 0.0 {
            return false;
        }

        let absorbed = self.armor.min(amount);
        self.armor -= absorbed;
        let remaining = amount - absorbed;

        if remaining > 0.0 {
            self.health = (self.health - remaining).max(0.0);
            if self.health <= 0.0 {
                self.kill();
                return true;
            }
        }
        false
    }

    pub fn add_health(&mut self, amount: f32) {
        self.health = (self.health + amount).min(PLAYER_MAX_HEALTH);
    }

    pub fn add_armor(&mut self, amount: f32) {
        self.armor = (self.armor + amount).min(PLAYER_MAX_ARMOR);
    }

    pub fn kill(&mut self) {
        self.dead = true;
        self.health = 0.0;
        self.respawn_timer = RESPAWN_SECONDS;
    }

    /// Full reset: health, armor, loadout and position.
    pub fn respawn(&mut self, x: f32, y: f32) {
        *self = Player::new(self.id, x, y);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyBehavior {
    Melee,
    Ranged {
        fire_rate_ms: u64,
        bullet_damage: f32,
        bullet_speed: f32,
        range: f32,
    },
    Miner {
        drop_rate_ms: u64,
        mine_damage: f32,
        range: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyProfile {
    pub health: f32,
    /// Pixels per second.
    pub speed: f32,
    pub size: f32,
    pub contact_damage: f32,
    pub behavior: EnemyBehavior,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Runner,
    Brute,
    Tank,
    Shooter,
    Boss,
    Miner,
}

impl EnemyKind {
    pub const REGULAR: [EnemyKind; 5] = [
        EnemyKind::Runner,
        EnemyKind::Brute,
        EnemyKind::Tank,
        EnemyKind::Shooter,
        EnemyKind::Miner,
    ];

    /// Wire-level type number, 1 through 6.
    pub fn type_id(self) -> u8 {
        match self {
            EnemyKind::Runner => 1,
            EnemyKind::Brute => 2,
            EnemyKind::Tank => 3,
            EnemyKind::Shooter => 4,
            EnemyKind::Boss => 5,
            EnemyKind::Miner => 6,
        }
    }

    pub fn from_type_id(type_id: u8) -> Option<EnemyKind> {
        match type_id {
            1 => Some(EnemyKind::Runner),
            2 => Some(EnemyKind::Brute),
            3 => Some(EnemyKind::Tank),
            4 => Some(EnemyKind::Shooter),
            5 => Some(EnemyKind::Boss),
            6 => Some(EnemyKind::Miner),
            _ => None,
        }
    }

    pub fn profile(self) -> EnemyProfile {
        match self {
            EnemyKind::Runner => EnemyProfile {
                health: 100.0,
                speed: 75.0,
                size: 20.0,
                contact_damage: 2.0,
                behavior: EnemyBehavior::Melee,
            },
            EnemyKind::Brute => EnemyProfile {
                health: 200.0,
                speed: 50.0,
                size: 28.0,
                contact_damage: 5.0,
                behavior: EnemyBehavior::Melee,
            },
            EnemyKind::Tank => EnemyProfile {
                health: 400.0,
                speed: 35.0,
                size: 36.0,
                contact_damage: 12.0,
                behavior: EnemyBehavior::Melee,
            },
            EnemyKind::Shooter => EnemyProfile {
                health: 150.0,
                speed: 30.0,
                size: 25.0,
                contact_damage: 5.0,
                behavior: EnemyBehavior::Ranged {
                    fire_rate_ms: 1000,
                    bullet_damage: 15.0,
                    bullet_speed: 8.0,
                    range: 300.0,
                },
            },
            EnemyKind::Boss => EnemyProfile {
                health: 5000.0,
                speed: 40.0,
                size: 80.0,
                contact_damage: 20.0,
                behavior: EnemyBehavior::Ranged {
                    fire_rate_ms: 500,
                    bullet_damage: 25.0,
                    bullet_speed: 12.0,
                    range: 300.0,
                },
            },
            EnemyKind::Miner => EnemyProfile {
                health: 80.0,
                speed: 90.0,
                size: 22.0,
                contact_damage: 3.0,
                behavior: EnemyBehavior::Miner {
                    drop_rate_ms: 2000,
                    mine_damage: 100.0,
                    range: 200.0,
                },
            },
        }
    }

    /// Score for killing this kind with a bullet.
    pub fn bullet_kill_points(self) -> u32 {
        match self {
            EnemyKind::Runner => 100,
            EnemyKind::Brute => 200,
            EnemyKind::Tank => 500,
            EnemyKind::Shooter => 300,
            EnemyKind::Boss => 2000,
            EnemyKind::Miner => 100,
        }
    }

    /// Score for killing this kind with a mine. Independent of the bullet table.
    pub fn mine_kill_points(self) -> u32 {
        match self {
            EnemyKind::Runner => 150,
            EnemyKind::Brute => 300,
            EnemyKind::Tank => 750,
            EnemyKind::Shooter => 450,
            EnemyKind::Boss | EnemyKind::Miner => 150,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Enemy {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: EnemyKind,
    pub health: f32,
    pub look_angle: f32,
    pub patrol_target: (f32, f32),
    pub patrol_timer: f32,
    pub last_shot_ms: Option<u64>,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            kind,
            health: kind.profile().health,
            look_angle: 0.0,
            patrol_target: (x, y),
            patrol_timer: 0.0,
            last_shot_ms: None,
        }
    }

    pub fn size(&self) -> f32 {
        self.kind.profile().size
    }

    pub fn bounds(&self) -> Rect {
        Rect::centered(self.x, self.y, self.size())
    }

    pub fn bounds_at(&self, x: f32, y: f32) -> Rect {
        Rect::centered(x, y, self.size())
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    /// Whether the behaviour cooldown of `rate_ms` has elapsed at `now_ms`.
    pub fn ready_to_act(&self, now_ms: u64, rate_ms: u64) -> bool {
        self.last_shot_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > rate_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    /// Degrees.
    pub angle: f32,
    pub owner: Owner,
    /// Pixels per tick.
    pub speed: f32,
    pub damage: f32,
    /// Ticks left before the bullet expires.
    pub lifetime: u32,
    pub max_range: f32,
    /// Splash radius for explosive rounds.
    pub explosion_radius: Option<f32>,
}

impl Bullet {
    pub fn from_weapon(x: f32, y: f32, angle: f32, owner: Owner, weapon: &Weapon) -> Self {
        Self {
            x,
            y,
            origin_x: x,
            origin_y: y,
            angle,
            owner,
            speed: weapon.projectile_speed,
            damage: weapon.damage,
            lifetime: BULLET_LIFETIME_TICKS,
            max_range: weapon.range,
            explosion_radius: weapon.explosion_radius(),
        }
    }

    pub fn enemy_shot(x: f32, y: f32, angle: f32, damage: f32, speed: f32) -> Self {
        Self {
            x,
            y,
            origin_x: x,
            origin_y: y,
            angle,
            owner: Owner::Enemy,
            speed,
            damage,
            lifetime: BULLET_LIFETIME_TICKS,
            max_range: ENEMY_BULLET_RANGE,
            explosion_radius: None,
        }
    }

    /// Moves one tick along the heading. Travelling past `max_range` forces
    /// the lifetime to zero.
    pub fn advance(&mut self) {
        let radians = self.angle.to_radians();
        self.x += radians.cos() * self.speed;
        self.y += radians.sin() * self.speed;
        self.lifetime = self.lifetime.saturating_sub(1);

        if self.distance_traveled() > self.max_range {
            self.lifetime = 0;
        }
    }

    pub fn distance_traveled(&self) -> f32 {
        crate::geometry::distance(self.x, self.y, self.origin_x, self.origin_y)
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime == 0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Wall {
    pub rect: Rect,
    pub player_placed: bool,
    pub indestructible: bool,
    pub health: f32,
}

impl Wall {
    /// Indestructible map geometry.
    pub fn fixed(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            rect: Rect::new(x, y, width, height),
            player_placed: false,
            indestructible: true,
            health: f32::INFINITY,
        }
    }

    pub fn player_placed(cx: f32, cy: f32, size: f32, health: f32) -> Self {
        Self {
            rect: Rect::centered(cx, cy, size / 2.0),
            player_placed: true,
            indestructible: false,
            health,
        }
    }

    pub fn apply_damage(&mut self, amount: f32) {
        if !self.indestructible {
            self.health -= amount;
        }
    }

    pub fn is_destroyed(&self) -> bool {
        !self.indestructible && self.health <= 0.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Mine {
    pub x: f32,
    pub y: f32,
    pub owner: Owner,
    pub damage: f32,
    pub active: bool,
    /// Seconds left on the fuse once active.
    pub activation_timer: f32,
    pub explosion_radius: f32,
}

impl Mine {
    pub fn new(x: f32, y: f32, owner: Owner, damage: f32) -> Self {
        Self {
            x,
            y,
            owner,
            damage,
            active: false,
            activation_timer: 0.0,
            explosion_radius: MINE_EXPLOSION_RADIUS,
        }
    }

    pub fn footprint(x: f32, y: f32) -> Rect {
        Rect::centered(x, y, MINE_SIZE)
    }

    pub fn arm(&mut self) {
        if !self.active {
            self.active = true;
            self.activation_timer = MINE_FUSE_SECONDS;
        }
    }

    /// Burns `dt` seconds of fuse; true once the mine should go off.
    pub fn tick_fuse(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        self.activation_timer -= dt;
        self.activation_timer <= 0.0
    }

    pub fn touches(&self, x: f32, y: f32, size: f32) -> bool {
        crate::geometry::distance(self.x, self.y, x, y) < size + MINE_SIZE
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum PickupKind {
    Health,
    Armor,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pickup {
    pub x: f32,
    pub y: f32,
    pub kind: PickupKind,
    pub value: f32,
}

impl Pickup {
    pub fn new(x: f32, y: f32, kind: PickupKind, value: f32) -> Self {
        Self { x, y, kind, value }
    }

    pub fn size(&self) -> f32 {
        PICKUP_SIZE
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LootBox {
    pub x: f32,
    pub y: f32,
    pub weapon: WeaponId,
}

impl LootBox {
    pub fn new(x: f32, y: f32, weapon: WeaponId) -> Self {
        Self { x, y, weapon }
    }

    pub fn size(&self) -> f32 {
        LOOTBOX_SIZE
    }
}
