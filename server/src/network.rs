//! Server network layer: TCP sessions, the tick loop and snapshot broadcasting

use crate::client_manager::{ClientManager, Frame, OUTBOUND_QUEUE_LEN};
use crate::config::ServerConfig;
use crate::game::GameState;
use log::{debug, error, info, warn};
use shared::protocol::{encode_frame, receive_packet, send_packet, write_frame};
use shared::Packet;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Messages sent from session tasks to the tick loop
#[derive(Debug)]
pub enum ServerMessage {
    ClientConnected { client_id: u32 },
    PacketReceived { client_id: u32, packet: Packet },
    ClientDisconnected { client_id: u32 },
}

/// Flips the running flag every server task watches.
#[derive(Clone)]
pub struct ShutdownHandle {
    running: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.running.send_replace(false);
    }
}

/// Main server coordinating sessions and the authoritative simulation
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    running: Arc<watch::Sender<bool>>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, BoxError> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (running, _) = watch::channel(true);

        Ok(Server {
            listener,
            clients: Arc::new(RwLock::new(ClientManager::new(config.max_players))),
            game_state: GameState::from_config(&config),
            config,
            running: Arc::new(running),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: Arc::clone(&self.running),
        }
    }

    /// Runs until the shutdown handle is triggered.
    pub async fn run(self) -> Result<(), BoxError> {
        let Server {
            listener,
            config,
            clients,
            mut game_state,
            running,
            server_tx,
            mut server_rx,
        } = self;

        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(game_state.snapshot()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&clients),
            server_tx,
            running.subscribe(),
        ));
        let broadcast_task = tokio::spawn(broadcast_loop(
            Arc::clone(&clients),
            snapshot_rx,
            config.broadcast_duration(),
            running.subscribe(),
        ));

        let mut running_rx = running.subscribe();
        let mut tick_interval = interval(config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started: {} Hz simulation, {} Hz broadcast, {} player slots",
            config.tick_rate, config.broadcast_rate, config.max_players
        );

        loop {
            if !*running_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = tick_interval.tick() => {}
                changed = running_rx.changed() => {
                    if changed.is_err() || !*running_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            while let Ok(message) = server_rx.try_recv() {
                handle_message(&mut game_state, &clients, message).await;
            }

            game_state.step();
            snapshot_tx.send_replace(Arc::new(game_state.snapshot()));
        }

        info!("Server shutting down at tick {}", game_state.tick);
        running.send_replace(false);
        if let Err(e) = accept_task.await {
            error!("Accept task failed: {}", e);
        }
        if let Err(e) = broadcast_task.await {
            error!("Broadcast task failed: {}", e);
        }
        Ok(())
    }
}

/// Applies one session message to the simulation
async fn handle_message(
    game_state: &mut GameState,
    clients: &RwLock<ClientManager>,
    message: ServerMessage,
) {
    match message {
        ServerMessage::ClientConnected { client_id } => {
            game_state.add_player(client_id);
            reply(clients, client_id, &Packet::Welcome { player_id: client_id }).await;
        }
        ServerMessage::PacketReceived { client_id, packet } => match packet {
            Packet::PlayerInput(input) => {
                game_state.set_input(client_id, input);
            }
            Packet::SwitchWeapon {
                selected_weapon_index,
            } => {
                if let Some(index) = game_state.switch_weapon(client_id, selected_weapon_index) {
                    let ack = Packet::SwitchWeaponAck {
                        selected_weapon_index: index,
                    };
                    reply(clients, client_id, &ack).await;
                } else {
                    debug!(
                        "Client {} asked for weapon slot {} it does not have",
                        client_id, selected_weapon_index
                    );
                }
            }
            Packet::RestartGame => {
                info!("Client {} requested a restart", client_id);
                game_state.restart();
            }
            other => {
                warn!(
                    "Unexpected {} packet from client {}",
                    other.kind(),
                    client_id
                );
            }
        },
        ServerMessage::ClientDisconnected { client_id } => {
            game_state.remove_player(client_id);
        }
    }
}

async fn reply(clients: &RwLock<ClientManager>, client_id: u32, packet: &Packet) {
    match encode_frame(packet) {
        Ok(frame) => {
            clients.write().await.send_to(client_id, Frame::from(frame));
        }
        Err(e) => error!("Failed to encode {} packet: {}", packet.kind(), e),
    }
}

async fn accept_loop(
    listener: TcpListener,
    clients: Arc<RwLock<ClientManager>>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    mut running: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Could not disable Nagle for {}: {}", addr, e);
                    }
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        Arc::clone(&clients),
                        server_tx.clone(),
                        running.clone(),
                    ));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },
            changed = running.changed() => {
                if changed.is_err() || !*running.borrow() {
                    break;
                }
            }
        }
    }
    debug!("Accept loop stopped");
}

/// One client session: registration, reader loop and cleanup
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    mut running: watch::Receiver<bool>,
) {
    let (reader, mut writer) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE_LEN);

    let client_id = clients.write().await.add_client(addr, outbound_tx);
    let client_id = match client_id {
        Some(id) => id,
        None => {
            info!("Rejecting {}: server full", addr);
            let rejected = Packet::Rejected {
                reason: "Server full".to_string(),
            };
            if let Err(e) = send_packet(&mut writer, &rejected).await {
                debug!("Failed to send rejection to {}: {}", addr, e);
            }
            if let Err(e) = writer.shutdown().await {
                debug!("Failed to close rejected connection {}: {}", addr, e);
            }
            return;
        }
    };

    if server_tx
        .send(ServerMessage::ClientConnected { client_id })
        .is_err()
    {
        clients.write().await.remove_client(&client_id);
        return;
    }

    let writer_task = tokio::spawn(write_loop(writer, outbound_rx, client_id));
    read_loop(reader, client_id, &server_tx, &mut running).await;

    end_session(&clients, &server_tx, client_id).await;
    if let Err(e) = writer_task.await {
        error!("Writer for client {} failed: {}", client_id, e);
    }
}

/// Queues the disconnect before the id goes back to the pool, so the tick loop
/// always sees a reused id's `ClientConnected` after this session's departure.
async fn end_session(
    clients: &RwLock<ClientManager>,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
    client_id: u32,
) {
    if server_tx
        .send(ServerMessage::ClientDisconnected { client_id })
        .is_err()
    {
        debug!("Tick loop stopped before client {} left", client_id);
    }
    // Dropping the registry entry closes the outbound queue and ends the writer.
    clients.write().await.remove_client(&client_id);
}

async fn read_loop(
    reader: OwnedReadHalf,
    client_id: u32,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
    running: &mut watch::Receiver<bool>,
) {
    let mut reader = BufReader::new(reader);
    loop {
        tokio::select! {
            received = receive_packet(&mut reader) => match received {
                Ok(Some(packet)) => {
                    if server_tx
                        .send(ServerMessage::PacketReceived { client_id, packet })
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Client {} closed the connection", client_id);
                    break;
                }
                Err(e) => {
                    warn!("Dropping client {}: {}", client_id, e);
                    break;
                }
            },
            changed = running.changed() => {
                if changed.is_err() || !*running.borrow() {
                    break;
                }
            }
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Frame>,
    client_id: u32,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!("Write to client {} failed: {}", client_id, e);
            break;
        }
    }
    if let Err(e) = writer.shutdown().await {
        debug!("Failed to close connection to client {}: {}", client_id, e);
    }
}

/// Encodes the newest snapshot once per broadcast tick and fans it out
async fn broadcast_loop(
    clients: Arc<RwLock<ClientManager>>,
    mut snapshots: watch::Receiver<Arc<Packet>>,
    period: Duration,
    mut running: watch::Receiver<bool>,
) {
    let mut broadcast_interval = interval(period);
    broadcast_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut broadcasts: u64 = 0;

    loop {
        tokio::select! {
            _ = broadcast_interval.tick() => {}
            changed = running.changed() => {
                if changed.is_err() || !*running.borrow() {
                    break;
                }
                continue;
            }
        }

        if !snapshots.has_changed().unwrap_or(false) {
            continue;
        }
        let snapshot = Arc::clone(&snapshots.borrow_and_update());
        let frame = match encode_frame(&snapshot) {
            Ok(frame) => Frame::from(frame),
            Err(e) => {
                error!("Failed to encode snapshot: {}", e);
                continue;
            }
        };

        let report = clients.write().await.broadcast(&frame);
        broadcasts += 1;
        if report.dropped > 0 || broadcasts % 300 == 0 {
            debug!(
                "Broadcast {} ({} bytes): {} delivered, {} dropped",
                broadcasts,
                frame.len(),
                report.delivered,
                report.dropped
            );
        }
    }
    debug!("Broadcast loop stopped");
}
