//! # Shared Game Model
//!
//! Types and constants used by both the authoritative server and the client.
//!
//! ## Layout
//! - [`geometry`]: rectangles, distances and explosion falloff
//! - [`weapons`]: the fixed weapon catalog
//! - [`entities`]: players, enemies, bullets, walls, mines and drops
//! - [`world`]: the [`WorldState`] aggregate and the arena map
//! - [`protocol`]: the length-prefixed packet codec
//!
//! Coordinates are pixels with the origin at the top-left corner of the
//! arena. Angles travel over the wire in degrees.

pub mod entities;
pub mod geometry;
pub mod protocol;
pub mod weapons;
pub mod world;

pub use entities::{
    Bullet, Enemy, EnemyBehavior, EnemyKind, EnemyProfile, LootBox, Mine, Owner, Pickup,
    PickupKind, Player, Wall,
};
pub use geometry::Rect;
pub use protocol::{Packet, PlayerInput, ProtocolError};
pub use weapons::{Weapon, WeaponBehavior, WeaponId};
pub use world::WorldState;

pub const WORLD_WIDTH: f32 = 4000.0;
pub const WORLD_HEIGHT: f32 = 3000.0;

/// Half extent of a player's collision box.
pub const PLAYER_SIZE: f32 = 30.0;
pub const PLAYER_MAX_HEALTH: f32 = 500.0;
pub const PLAYER_MAX_ARMOR: f32 = 400.0;
pub const PLAYER_SPEED: f32 = 5.0;
/// Pixels moved per tick are `speed * PLAYER_MOVE_MULTIPLIER`.
pub const PLAYER_MOVE_MULTIPLIER: f32 = 2.0;
pub const RESPAWN_SECONDS: f32 = 5.0;
pub const DEFAULT_SPAWN: (f32, f32) = (400.0, 300.0);

pub const BULLET_LIFETIME_TICKS: u32 = 60;
pub const ENEMY_BULLET_RANGE: f32 = 300.0;

pub const MINE_SIZE: f32 = 12.0;
pub const MINE_FUSE_SECONDS: f32 = 1.0;
pub const MINE_EXPLOSION_RADIUS: f32 = 60.0;

pub const PICKUP_SIZE: f32 = 10.0;
pub const LOOTBOX_SIZE: f32 = 15.0;
pub const HEALTH_PICKUP_AMOUNT: f32 = 50.0;
pub const ARMOR_PICKUP_AMOUNT: f32 = 100.0;

pub const TICK_RATE: u32 = 60;
pub const BROADCAST_RATE: u32 = 30;
pub const DEFAULT_PORT: u16 = 5555;

pub const MAX_ALIVE_ENEMIES: usize = 10;
pub const WAVE_COOLDOWN_SECONDS: f32 = 5.0;
pub const BOSS_WAVE_INTERVAL: u32 = 5;

/// Side length of one pathfinding cell.
pub const NAV_CELL_SIZE: f32 = 40.0;
