//! # Arena Server Library
//!
//! The authoritative server for the co-operative arena shooter. It owns the
//! canonical world, applies client requests, runs enemies and waves, and
//! streams snapshots of the world to every connected client.
//!
//! ## Architecture
//!
//! ### Single Writer
//! Only the tick loop touches [`game::GameState`]. Session tasks forward
//! decoded packets over an unbounded channel and the loop drains it at the
//! start of every tick, so the simulation never races with the network.
//!
//! ### TCP Sessions
//! Each connection gets a reader loop and a writer task. Outbound frames go
//! through a bounded per-client queue held by [`client_manager::ClientManager`];
//! a slow client loses snapshots instead of stalling everyone else.
//!
//! ### Snapshot Broadcasting
//! The tick loop publishes the latest world on a `watch` channel. A separate
//! task encodes it once per broadcast tick and fans the frame out.
//!
//! ## Module Organization
//!
//! - `config`: command line options
//! - `client_manager`: session table, id assignment and outbound queues
//! - `network`: listener, sessions, tick loop and broadcaster
//! - `game`: world simulation and the per-tick phases
//! - `waves`: wave state machine and enemy spawning
//! - `ai`: enemy behaviour and movement
//! - `pathfinding`: navigation grid and A*
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::new(ServerConfig::default()).await?;
//!     let shutdown = server.shutdown_handle();
//!
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         shutdown.shutdown();
//!     });
//!
//!     server.run().await
//! }
//! ```

pub mod ai;
pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod pathfinding;
pub mod waves;
