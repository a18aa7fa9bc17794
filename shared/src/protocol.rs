//! Length-prefixed packet framing shared by the server and the client
//!
//! Every message on the wire is a 4-byte big-endian length followed by that
//! many bytes of a bincode-encoded [`Packet`]. The enum variant is the message
//! type; [`Packet::kind`] gives its catalog name for logging.
//!
//! A frame is all or nothing: if the stream ends anywhere inside a frame the
//! receiver reports end-of-stream and the connection is treated as lost.

use crate::world::WorldState;
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame body; anything larger is a corrupt stream.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}

/// Latest control state sent by a client. Angles are in degrees and the mouse
/// position is in world coordinates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub dx: f32,
    pub dy: f32,
    pub angle: f32,
    pub shoot: bool,
    pub mouse_x: f32,
    pub mouse_y: f32,
}

impl PlayerInput {
    /// No movement, no shooting, aiming at `(x, y)`.
    pub fn neutral(x: f32, y: f32) -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            angle: 0.0,
            shoot: false,
            mouse_x: x,
            mouse_y: y,
        }
    }

    /// Clamps the movement axes into `[-1, 1]` and replaces non-finite values.
    pub fn sanitized(mut self) -> Self {
        let axis = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.dx = axis(self.dx);
        self.dy = axis(self.dy);
        if !self.angle.is_finite() {
            self.angle = 0.0;
        }
        if !self.mouse_x.is_finite() || !self.mouse_y.is_finite() {
            self.mouse_x = 0.0;
            self.mouse_y = 0.0;
        }
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Server -> client
    Welcome { player_id: u32 },
    Rejected { reason: String },
    SwitchWeaponAck { selected_weapon_index: usize },
    GameState { tick: u64, world: WorldState },

    // Client -> server
    PlayerInput(PlayerInput),
    SwitchWeapon { selected_weapon_index: usize },
    RestartGame,
}

impl Packet {
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Welcome { .. } => "welcome",
            Packet::Rejected { .. } => "rejected",
            Packet::SwitchWeaponAck { .. } => "switch_weapon_ack",
            Packet::GameState { .. } => "game_state",
            Packet::PlayerInput(_) => "player_input",
            Packet::SwitchWeapon { .. } => "switch_weapon",
            Packet::RestartGame => "restart_game",
        }
    }
}

/// Serializes a packet into a complete frame, length prefix included.
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let body = serialize(packet)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Writes an already encoded frame.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn send_packet<W>(writer: &mut W, packet: &Packet) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(packet)?;
    write_frame(writer, &frame).await
}

/// Reads one packet. `Ok(None)` means the peer closed the stream, possibly
/// in the middle of a frame.
pub async fn receive_packet<R>(reader: &mut R) -> Result<Option<Packet>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    if !read_full(reader, &mut len_buf).await? {
        return Ok(None);
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    if !read_full(reader, &mut body).await? {
        return Ok(None);
    }

    Ok(Some(deserialize(&body)?))
}

/// Fills `buf` completely; false if the stream hit EOF first.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}
