use crate::game::{ClientEvent, ClientGameState};
use crate::input::{BotAction, BotInput};
use log::{debug, error, info, warn};
use shared::protocol::{receive_packet, send_packet};
use shared::Packet;
use std::error::Error;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Summary of one `run`
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub player_id: Option<u32>,
    pub snapshots: u64,
    pub last_tick: Option<u64>,
    pub score: u32,
    pub rejected: Option<String>,
}

/// Headless bot client: mirrors snapshots and plays with scripted input
pub struct Client {
    writer: OwnedWriteHalf,
    packets: mpsc::UnboundedReceiver<Packet>,
    reader_task: JoinHandle<()>,

    game_state: ClientGameState,
    bot: BotInput,
}

impl Client {
    pub async fn connect(server_addr: &str) -> Result<Self, BoxError> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        let (packet_tx, packets) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(reader, packet_tx));

        Ok(Client {
            writer,
            packets,
            reader_task,
            game_state: ClientGameState::new(),
            bot: BotInput::new(),
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<(), BoxError> {
        send_packet(&mut self.writer, packet).await?;
        Ok(())
    }

    /// Next packet from the server, applied to the local mirror. None once the
    /// server has closed the connection.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        let packet = self.packets.recv().await?;
        Some(self.game_state.apply_packet(packet))
    }

    /// Plays until `duration` elapses (forever when None), the server closes
    /// the connection, or the connection is rejected.
    pub async fn run(&mut self, duration: Option<Duration>) -> Result<RunSummary, BoxError> {
        let mut input_interval = interval(Duration::from_millis(16));
        input_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_interval = interval(Duration::from_secs(1));

        let deadline = sleep(duration.unwrap_or_default());
        tokio::pin!(deadline);
        let started = Instant::now();

        loop {
            tokio::select! {
                received = self.packets.recv() => match received {
                    Some(packet) => {
                        if let ClientEvent::Rejected(_) = self.game_state.apply_packet(packet) {
                            break;
                        }
                    }
                    None => {
                        info!("Server closed the connection");
                        break;
                    }
                },

                _ = input_interval.tick() => {
                    let packet = match self.bot.next_action(&self.game_state) {
                        BotAction::Move(input) => Packet::PlayerInput(input),
                        BotAction::Restart => {
                            info!("Game over, requesting a restart");
                            Packet::RestartGame
                        }
                        BotAction::Wait => continue,
                    };
                    if let Err(e) = self.send(&packet).await {
                        error!("Error sending {}: {}", packet.kind(), e);
                        break;
                    }
                },

                _ = status_interval.tick() => self.log_status(started),

                _ = &mut deadline, if duration.is_some() => {
                    debug!("Run duration elapsed");
                    break;
                },
            }
        }

        Ok(self.summary())
    }

    fn log_status(&self, started: Instant) {
        let state = &self.game_state;
        match state.own_player() {
            Some(player) => info!(
                "[{:>4}s] tick {:?} wave {:?} hp {:.0} armor {:.0} weapon {} score {} enemies {}",
                started.elapsed().as_secs(),
                state.last_tick,
                state.wave(),
                player.health,
                player.armor,
                player.current_weapon().name,
                state.own_score(),
                state.world.as_ref().map_or(0, |w| w.enemies.len())
            ),
            None => debug!("Waiting for welcome and first snapshot"),
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            player_id: self.game_state.player_id,
            snapshots: self.game_state.snapshots_received,
            last_tick: self.game_state.last_tick,
            score: self.game_state.own_score(),
            rejected: self.game_state.rejected.clone(),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_loop(reader: OwnedReadHalf, packets: mpsc::UnboundedSender<Packet>) {
    let mut reader = BufReader::new(reader);
    loop {
        match receive_packet(&mut reader).await {
            Ok(Some(packet)) => {
                if packets.send(packet).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error receiving packet: {}", e);
                break;
            }
        }
    }
}
