//! # Arena Client Library
//!
//! A headless client for the arena server. It connects over TCP, keeps a
//! mirror of the latest world snapshot and drives its player with a simple
//! bot, which makes it useful for load testing and smoke testing a server.
//!
//! ## Module Organization
//!
//! - `network`: connection, reader task and the select loop
//! - `game`: snapshot mirror and per-packet bookkeeping
//! - `input`: the scripted bot that turns the mirror into inputs
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut client = Client::connect("127.0.0.1:5555").await?;
//!     let summary = client.run(Some(Duration::from_secs(10))).await?;
//!     println!("{} snapshots, score {}", summary.snapshots, summary.score);
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
