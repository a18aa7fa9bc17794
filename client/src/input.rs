//! Scripted input for the headless client

use crate::game::ClientGameState;
use shared::geometry::angle_to;
use shared::PlayerInput;

/// Radians added to the strafe heading per input tick.
const STRAFE_TURN_RATE: f32 = 0.05;

/// What the bot wants to send this input tick
#[derive(Debug, Clone, PartialEq)]
pub enum BotAction {
    /// Nothing to do yet (no welcome or no snapshot)
    Wait,
    Move(PlayerInput),
    Restart,
}

/// Circle-strafes and shoots at the nearest enemy
#[derive(Debug, Default)]
pub struct BotInput {
    strafe_phase: f32,
    restart_requested: bool,
}

impl BotInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_action(&mut self, state: &ClientGameState) -> BotAction {
        if state.is_game_over() {
            // One restart request per game over.
            if self.restart_requested {
                return BotAction::Wait;
            }
            self.restart_requested = true;
            return BotAction::Restart;
        }
        self.restart_requested = false;

        let player = match state.own_player() {
            Some(player) if !player.dead => player,
            _ => return BotAction::Wait,
        };

        self.strafe_phase = (self.strafe_phase + STRAFE_TURN_RATE) % std::f32::consts::TAU;
        let mut input = PlayerInput {
            dx: self.strafe_phase.cos(),
            dy: self.strafe_phase.sin(),
            ..PlayerInput::neutral(player.x, player.y)
        };
        input.angle = player.angle;

        if let Some(enemy) = state.nearest_enemy() {
            input.angle = angle_to(player.x, player.y, enemy.x, enemy.y);
            input.shoot = true;
            input.mouse_x = enemy.x;
            input.mouse_y = enemy.y;
        }
        BotAction::Move(input)
    }
}
