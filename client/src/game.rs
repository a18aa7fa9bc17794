//! Client-side mirror of the authoritative world

use log::{debug, info, warn};
use shared::geometry::distance;
use shared::{Enemy, Packet, Player, WorldState};

/// What a received packet changed, for the caller to react to
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Welcomed(u32),
    Rejected(String),
    Snapshot(u64),
    /// Older than the last applied snapshot
    StaleSnapshot(u64),
    WeaponSwitched(usize),
    Ignored,
}

/// Latest known world plus this client's identity
#[derive(Debug, Default)]
pub struct ClientGameState {
    pub player_id: Option<u32>,
    pub last_tick: Option<u64>,
    pub world: Option<WorldState>,
    pub snapshots_received: u64,
    /// Last index confirmed by the server
    pub confirmed_weapon_index: usize,
    pub rejected: Option<String>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_packet(&mut self, packet: Packet) -> ClientEvent {
        match packet {
            Packet::Welcome { player_id } => {
                info!("Joined as player {}", player_id);
                self.player_id = Some(player_id);
                ClientEvent::Welcomed(player_id)
            }
            Packet::Rejected { reason } => {
                warn!("Server rejected the connection: {}", reason);
                self.rejected = Some(reason.clone());
                ClientEvent::Rejected(reason)
            }
            Packet::GameState { tick, world } => self.apply_snapshot(tick, world),
            Packet::SwitchWeaponAck {
                selected_weapon_index,
            } => {
                debug!("Weapon slot {} confirmed", selected_weapon_index);
                self.confirmed_weapon_index = selected_weapon_index;
                ClientEvent::WeaponSwitched(selected_weapon_index)
            }
            other => {
                warn!("Unexpected {} packet from server", other.kind());
                ClientEvent::Ignored
            }
        }
    }

    /// Snapshots may be skipped but never applied out of order.
    pub fn apply_snapshot(&mut self, tick: u64, world: WorldState) -> ClientEvent {
        if self.last_tick.map_or(false, |last| tick < last) {
            return ClientEvent::StaleSnapshot(tick);
        }
        self.last_tick = Some(tick);
        self.world = Some(world);
        self.snapshots_received += 1;
        ClientEvent::Snapshot(tick)
    }

    pub fn own_player(&self) -> Option<&Player> {
        let id = self.player_id?;
        self.world.as_ref()?.players.get(&id)
    }

    pub fn is_game_over(&self) -> bool {
        self.world.as_ref().map_or(false, |w| w.game_over)
    }

    pub fn wave(&self) -> Option<u32> {
        self.world.as_ref().map(|w| w.wave)
    }

    pub fn own_score(&self) -> u32 {
        match (self.player_id, self.world.as_ref()) {
            (Some(id), Some(world)) => world.score(id),
            _ => 0,
        }
    }

    pub fn nearest_enemy(&self) -> Option<&Enemy> {
        let player = self.own_player()?;
        let world = self.world.as_ref()?;
        world.enemies.iter().min_by(|a, b| {
            let da = distance(player.x, player.y, a.x, a.y);
            let db = distance(player.x, player.y, b.x, b.y);
            da.total_cmp(&db)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::EnemyKind;

    fn world_with_player(id: u32) -> WorldState {
        let mut world = WorldState::empty();
        world.players.insert(id, Player::new(id, 100.0, 100.0));
        world
    }

    #[test]
    fn test_welcome_sets_player_id() {
        let mut state = ClientGameState::new();
        assert_eq!(
            state.apply_packet(Packet::Welcome { player_id: 3 }),
            ClientEvent::Welcomed(3)
        );
        assert_eq!(state.player_id, Some(3));
        assert!(state.own_player().is_none());
    }

    #[test]
    fn test_stale_snapshots_are_ignored() {
        let mut state = ClientGameState::new();
        state.apply_snapshot(10, world_with_player(0));
        let mut older = world_with_player(0);
        older.wave = 7;

        assert_eq!(state.apply_snapshot(9, older), ClientEvent::StaleSnapshot(9));
        assert_eq!(state.last_tick, Some(10));
        assert_eq!(state.wave(), Some(1));
        assert_eq!(state.snapshots_received, 1);

        assert_eq!(
            state.apply_snapshot(12, world_with_player(0)),
            ClientEvent::Snapshot(12)
        );
    }

    #[test]
    fn test_nearest_enemy_is_relative_to_own_player() {
        let mut state = ClientGameState::new();
        state.apply_packet(Packet::Welcome { player_id: 1 });
        let mut world = world_with_player(1);
        world.enemies.push(Enemy::new(0, EnemyKind::Tank, 900.0, 900.0));
        world.enemies.push(Enemy::new(1, EnemyKind::Runner, 150.0, 120.0));
        state.apply_snapshot(1, world);

        assert_eq!(state.nearest_enemy().map(|e| e.id), Some(1));
    }

    #[test]
    fn test_switch_ack_and_rejection() {
        let mut state = ClientGameState::new();
        state.apply_packet(Packet::SwitchWeaponAck {
            selected_weapon_index: 2,
        });
        assert_eq!(state.confirmed_weapon_index, 2);

        let event = state.apply_packet(Packet::Rejected {
            reason: "Server full".to_string(),
        });
        assert_eq!(event, ClientEvent::Rejected("Server full".to_string()));
        assert_eq!(state.rejected.as_deref(), Some("Server full"));
    }

    #[test]
    fn test_client_bound_packets_only() {
        let mut state = ClientGameState::new();
        assert_eq!(state.apply_packet(Packet::RestartGame), ClientEvent::Ignored);
    }
}
