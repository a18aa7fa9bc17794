use clap::Parser;
use client::network::Client;
use log::info;
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    server: String,

    /// Server port
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds to play before disconnecting (runs until the server goes away if omitted)
    #[arg(short = 'd', long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.server, args.port);

    info!("Starting client...");
    let mut client = Client::connect(&address).await?;
    let summary = client.run(args.duration.map(Duration::from_secs)).await?;

    info!(
        "Session over: player {:?}, {} snapshots, last tick {:?}, score {}",
        summary.player_id, summary.snapshots, summary.last_tick, summary.score
    );
    if let Some(reason) = summary.rejected {
        return Err(format!("rejected by server: {}", reason).into());
    }
    Ok(())
}
