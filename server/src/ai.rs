//! Enemy behaviour
//!
//! Each tick an enemy either frees itself from a wall, engages the nearest
//! living player (shoot, drop a mine, or close the distance), or patrols when
//! nobody is alive. Pursuit goes straight at the target with line of sight and
//! follows the navigation grid without it; a step that would clip a wall is
//! replaced by a detour around that wall's corners.

use crate::game::GameState;
use log::info;
use rand::Rng;
use shared::geometry::{angle_to, distance, Rect};
use shared::{Bullet, Enemy, EnemyBehavior, Mine, Owner, Wall, PLAYER_SIZE};
use std::f32::consts::FRAC_PI_2;

/// Pixels an enemy stuck inside a wall is pushed per tick.
const UNSTICK_STEP: f32 = 5.0;
/// Line of sight is sampled at this many segments.
const LOS_STEPS: u32 = 10;
/// Weight of corner-to-target distance when choosing a detour corner.
const CORNER_TARGET_WEIGHT: f32 = 1.5;
const CORNER_JITTER: f32 = 0.05;
const PATROL_SECONDS: f32 = 2.0;
const PATROL_RANGE: i32 = 200;
const PATROL_ARRIVAL_RADIUS: f32 = 2.0;
const PATROL_RETARGET_LIMIT: u32 = 8;

/// True when no wall contains any of the sampled points between the two ends.
pub fn has_line_of_sight(walls: &[Wall], x1: f32, y1: f32, x2: f32, y2: f32) -> bool {
    (0..=LOS_STEPS).all(|i| {
        let t = i as f32 / LOS_STEPS as f32;
        let x = x1 + (x2 - x1) * t;
        let y = y1 + (y2 - y1) * t;
        !walls.iter().any(|w| w.rect.contains_point(x, y))
    })
}

struct Target {
    id: u32,
    x: f32,
    y: f32,
}

impl GameState {
    pub(crate) fn update_enemies(&mut self, dt: f32, now_ms: u64) {
        self.refresh_nav_grid();

        let mut enemies = std::mem::take(&mut self.world.enemies);
        for enemy in enemies.iter_mut() {
            self.drive_enemy(enemy, dt, now_ms);
        }
        self.world.enemies = enemies;
    }

    fn drive_enemy(&mut self, enemy: &mut Enemy, dt: f32, now_ms: u64) {
        if self.unstick(enemy) {
            return;
        }

        let profile = enemy.kind.profile();
        let target = self
            .world
            .living_players()
            .min_by(|a, b| {
                let da = distance(enemy.x, enemy.y, a.x, a.y);
                let db = distance(enemy.x, enemy.y, b.x, b.y);
                da.total_cmp(&db)
            })
            .map(|p| Target {
                id: p.id,
                x: p.x,
                y: p.y,
            });

        let target = match target {
            Some(target) => target,
            None => {
                self.patrol(enemy, dt);
                return;
            }
        };

        let dist = distance(enemy.x, enemy.y, target.x, target.y);
        let los = has_line_of_sight(&self.world.walls, enemy.x, enemy.y, target.x, target.y);

        match profile.behavior {
            EnemyBehavior::Ranged {
                fire_rate_ms,
                bullet_damage,
                bullet_speed,
                range,
            } if dist < range && los => {
                enemy.look_angle = angle_to(enemy.x, enemy.y, target.x, target.y);
                if enemy.ready_to_act(now_ms, fire_rate_ms) {
                    enemy.last_shot_ms = Some(now_ms);
                    self.world.bullets.push(Bullet::enemy_shot(
                        enemy.x,
                        enemy.y,
                        enemy.look_angle,
                        bullet_damage,
                        bullet_speed,
                    ));
                }
            }
            EnemyBehavior::Miner {
                drop_rate_ms,
                mine_damage,
                range,
            } if dist < range && los => {
                enemy.look_angle = angle_to(enemy.x, enemy.y, target.x, target.y);
                if enemy.ready_to_act(now_ms, drop_rate_ms) {
                    enemy.last_shot_ms = Some(now_ms);
                    self.world
                        .mines
                        .push(Mine::new(enemy.x, enemy.y, Owner::Enemy, mine_damage));
                }
            }
            _ => self.pursue(enemy, &target, los, dt),
        }

        if distance(enemy.x, enemy.y, target.x, target.y) < enemy.size() + PLAYER_SIZE {
            if let Some(player) = self.world.players.get_mut(&target.id) {
                if player.take_damage(profile.contact_damage) {
                    info!("Player {} was overrun by {:?}", player.id, enemy.kind);
                }
            }
        }
    }

    /// Pushes an enemy overlapping a wall away from that wall's centre.
    fn unstick(&self, enemy: &mut Enemy) -> bool {
        let bounds = enemy.bounds();
        match self.world.walls.iter().find(|w| w.rect.intersects(&bounds)) {
            Some(wall) => {
                let (cx, cy) = wall.rect.center();
                let away = (enemy.y - cy).atan2(enemy.x - cx);
                enemy.x += away.cos() * UNSTICK_STEP;
                enemy.y += away.sin() * UNSTICK_STEP;
                true
            }
            None => false,
        }
    }

    fn pursue(&mut self, enemy: &mut Enemy, target: &Target, los: bool, dt: f32) {
        let speed = enemy.kind.profile().speed;
        let (goal_x, goal_y) = if los {
            (target.x, target.y)
        } else {
            self.nav
                .next_waypoint((enemy.x, enemy.y), (target.x, target.y))
                .unwrap_or((target.x, target.y))
        };

        let heading = (goal_y - enemy.y).atan2(goal_x - enemy.x);
        let mut velocity = (heading.cos() * speed, heading.sin() * speed);

        let next = enemy.bounds_at(enemy.x + velocity.0 * dt, enemy.y + velocity.1 * dt);
        let blocking = self
            .world
            .walls
            .iter()
            .find(|w| w.rect.intersects(&next))
            .map(|w| w.rect);
        if let Some(wall) = blocking {
            velocity = self.route_around_wall(enemy, target, &wall, dt);
        }

        enemy.look_angle = velocity.1.atan2(velocity.0).to_degrees();
        enemy.x += velocity.0 * dt;
        enemy.y += velocity.1 * dt;
    }

    /// Velocity towards the best corner of `wall`, or a sideways dodge when
    /// even that step is blocked. The dodge prefers whichever side is free.
    fn route_around_wall(
        &mut self,
        enemy: &Enemy,
        target: &Target,
        wall: &Rect,
        dt: f32,
    ) -> (f32, f32) {
        let speed = enemy.kind.profile().speed;
        let margin = enemy.size() * 2.0;
        let corners = [
            (wall.left() - margin, wall.top() - margin),
            (wall.right() + margin, wall.top() - margin),
            (wall.left() - margin, wall.bottom() + margin),
            (wall.right() + margin, wall.bottom() + margin),
        ];

        let best = corners.iter().copied().min_by(|a, b| {
            let score = |c: &(f32, f32)| {
                distance(c.0, c.1, enemy.x, enemy.y)
                    + distance(c.0, c.1, target.x, target.y) * CORNER_TARGET_WEIGHT
            };
            score(a).total_cmp(&score(b))
        });

        if let Some((cx, cy)) = best {
            let angle = (cy - enemy.y).atan2(cx - enemy.x)
                + self.rng.gen_range(-CORNER_JITTER..=CORNER_JITTER);
            let step = enemy.bounds_at(
                enemy.x + angle.cos() * speed * dt,
                enemy.y + angle.sin() * speed * dt,
            );
            if !self.hits_wall(&step) {
                return (angle.cos() * speed, angle.sin() * speed);
            }
        }

        let toward = (target.y - enemy.y).atan2(target.x - enemy.x);
        let (first, second) = if self.rng.gen_bool(0.5) {
            (toward + FRAC_PI_2, toward - FRAC_PI_2)
        } else {
            (toward - FRAC_PI_2, toward + FRAC_PI_2)
        };
        let clear = |angle: f32| {
            !self.hits_wall(&enemy.bounds_at(
                enemy.x + angle.cos() * speed * dt,
                enemy.y + angle.sin() * speed * dt,
            ))
        };
        // With both sides blocked the first one stands and unstick recovers.
        let dodge = if clear(first) || !clear(second) {
            first
        } else {
            second
        };
        (dodge.cos() * speed, dodge.sin() * speed)
    }

    fn patrol(&mut self, enemy: &mut Enemy, dt: f32) {
        let speed = enemy.kind.profile().speed;
        enemy.patrol_timer += dt;

        let mut retargets = 0;
        let heading = loop {
            let (tx, ty) = enemy.patrol_target;
            let arrived = distance(enemy.x, enemy.y, tx, ty) < PATROL_ARRIVAL_RADIUS;
            let angle = (ty - enemy.y).atan2(tx - enemy.x);
            let blocked = !arrived
                && self.hits_wall(&enemy.bounds_at(
                    enemy.x + angle.cos() * speed * dt,
                    enemy.y + angle.sin() * speed * dt,
                ));

            if !(arrived || blocked || enemy.patrol_timer >= PATROL_SECONDS) {
                break Some(angle);
            }
            if retargets >= PATROL_RETARGET_LIMIT {
                break None;
            }

            enemy.patrol_timer = 0.0;
            enemy.patrol_target = (
                enemy.x + self.rng.gen_range(-PATROL_RANGE..=PATROL_RANGE) as f32,
                enemy.y + self.rng.gen_range(-PATROL_RANGE..=PATROL_RANGE) as f32,
            );
            retargets += 1;
        };

        if let Some(angle) = heading {
            enemy.look_angle = angle.to_degrees();
            enemy.x += angle.cos() * speed * dt;
            enemy.y += angle.sin() * speed * dt;
        }
    }
}
