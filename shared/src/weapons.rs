//! Fixed weapon catalog
//!
//! Every weapon in the game is one of the [`WeaponId`] variants. The numbers
//! behind each id never change at runtime, so players and loot boxes only
//! carry the id and look the entry up through [`WeaponId::stats`].

use serde::{Deserialize, Serialize};

/// Firing logic selected by a weapon, with the parameters that logic needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponBehavior {
    /// One bullet along the facing angle.
    Projectile,
    /// `pellets` bullets fanned out evenly over `arc_degrees`.
    Spread { pellets: u8, arc_degrees: f32 },
    /// One bullet that splashes enemies within `radius` on impact.
    Explosive { radius: f32 },
    /// Places a destructible square wall centred on the aim point.
    WallSpawner { size: f32, health: f32 },
    /// Places a mine at the aim point unless the spot overlaps a wall.
    MinePlacer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub id: WeaponId,
    pub name: &'static str,
    pub damage: f32,
    /// Minimum milliseconds between two shots.
    pub fire_rate_ms: u64,
    /// Pixels per tick.
    pub projectile_speed: f32,
    /// `None` means the weapon never runs dry.
    pub ammo_capacity: Option<u32>,
    /// Maximum travel distance of the weapon's bullets.
    pub range: f32,
    pub behavior: WeaponBehavior,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeaponId {
    Pistol,
    Smg,
    WallSpawner,
    MinePlacer,
    Shotgun,
    Bazooka,
}

pub const WEAPON_CATALOG: [Weapon; 6] = [
    Weapon {
        id: WeaponId::Pistol,
        name: "Pistol",
        damage: 25.0,
        fire_rate_ms: 250,
        projectile_speed: 10.0,
        ammo_capacity: None,
        range: 300.0,
        behavior: WeaponBehavior::Projectile,
    },
    Weapon {
        id: WeaponId::Smg,
        name: "SMG",
        damage: 25.0,
        fire_rate_ms: 100,
        projectile_speed: 15.0,
        ammo_capacity: Some(150),
        range: 300.0,
        behavior: WeaponBehavior::Projectile,
    },
    Weapon {
        id: WeaponId::WallSpawner,
        name: "Wall Spawner",
        damage: 0.0,
        fire_rate_ms: 1000,
        projectile_speed: 0.0,
        ammo_capacity: Some(20),
        range: 0.0,
        behavior: WeaponBehavior::WallSpawner {
            size: 40.0,
            health: 100.0,
        },
    },
    Weapon {
        id: WeaponId::MinePlacer,
        name: "Mine Placer",
        damage: 150.0,
        fire_rate_ms: 1000,
        projectile_speed: 0.0,
        ammo_capacity: Some(20),
        range: 0.0,
        behavior: WeaponBehavior::MinePlacer,
    },
    Weapon {
        id: WeaponId::Shotgun,
        name: "Shotgun",
        damage: 40.0,
        fire_rate_ms: 750,
        projectile_speed: 12.0,
        ammo_capacity: Some(50),
        range: 180.0,
        behavior: WeaponBehavior::Spread {
            pellets: 3,
            arc_degrees: 15.0,
        },
    },
    Weapon {
        id: WeaponId::Bazooka,
        name: "Bazooka",
        damage: 300.0,
        fire_rate_ms: 1500,
        projectile_speed: 8.0,
        ammo_capacity: Some(5),
        range: 300.0,
        behavior: WeaponBehavior::Explosive { radius: 60.0 },
    },
];

/// Weapons that can come out of a random loot box.
pub const DROPPABLE_WEAPONS: [WeaponId; 5] = [
    WeaponId::Smg,
    WeaponId::WallSpawner,
    WeaponId::MinePlacer,
    WeaponId::Shotgun,
    WeaponId::Bazooka,
];

impl WeaponId {
    pub fn stats(self) -> &'static Weapon {
        &WEAPON_CATALOG[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.stats().name
    }

    pub fn from_name(name: &str) -> Option<WeaponId> {
        WEAPON_CATALOG.iter().find(|w| w.name == name).map(|w| w.id)
    }
}

impl Weapon {
    pub fn is_unlimited(&self) -> bool {
        self.ammo_capacity.is_none()
    }

    /// Firing angles, in degrees, for one trigger pull aimed at `facing`.
    pub fn shot_angles(&self, facing: f32) -> Vec<f32> {
        match self.behavior {
            WeaponBehavior::Spread {
                pellets,
                arc_degrees,
            } => {
                let count = f32::from(pellets);
                (0..pellets)
                    .map(|i| facing + (f32::from(i) - (count - 1.0) / 2.0) * (arc_degrees / count))
                    .collect()
            }
            WeaponBehavior::Projectile | WeaponBehavior::Explosive { .. } => vec![facing],
            WeaponBehavior::WallSpawner { .. } | WeaponBehavior::MinePlacer => Vec::new(),
        }
    }

    pub fn explosion_radius(&self) -> Option<f32> {
        match self.behavior {
            WeaponBehavior::Explosive { radius } => Some(radius),
            _ => None,
        }
    }
}
