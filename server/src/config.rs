//! Command line configuration for the server binary

use clap::Parser;
use shared::{BROADCAST_RATE, DEFAULT_PORT, TICK_RATE};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Authoritative arena survival server")]
pub struct ServerConfig {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Simulation ticks per second
    #[clap(short, long, default_value_t = TICK_RATE)]
    pub tick_rate: u32,

    /// Snapshot broadcasts per second
    #[clap(short, long, default_value_t = BROADCAST_RATE)]
    pub broadcast_rate: u32,

    /// Maximum concurrently connected players
    #[clap(short, long, default_value_t = 8)]
    pub max_players: usize,

    /// Seed for the simulation RNG
    #[clap(long)]
    pub seed: Option<u64>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn broadcast_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.broadcast_rate.max(1)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tick_rate: TICK_RATE,
            broadcast_rate: BROADCAST_RATE,
            max_players: 8,
            seed: None,
        }
    }
}
