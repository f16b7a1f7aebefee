use clap::Parser;
use client::bot::ScriptedInput;
use client::config::SyncConfig;
use client::network::{Client, NetworkConditions};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds (round trip)
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Probability of dropping a datagram, 0.0 to 1.0
    #[arg(long, default_value = "0.0")]
    packet_loss: f64,

    /// Frames buffered per input batch
    #[arg(short = 'b', long, default_value = "3")]
    frames_per_batch: u32,

    /// Milliseconds between latency probes
    #[arg(long, default_value = "500")]
    probe_interval: u64,

    /// Stop after this many seconds (runs until ctrl-c when omitted)
    #[arg(short = 'd', long)]
    duration_secs: Option<u64>,

    /// Seed for the scripted input and the loss simulation
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Connect without driving any input
    #[arg(long)]
    idle: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    if args.packet_loss > 0.0 {
        info!("Simulating {:.1}% packet loss", args.packet_loss * 100.0);
    }

    let config = SyncConfig {
        frames_per_batch: args.frames_per_batch.max(1),
        probe_interval_ms: args.probe_interval as f64,
        ..SyncConfig::default()
    };
    let conditions = NetworkConditions {
        fake_ping_ms: args.fake_ping,
        packet_loss: args.packet_loss.clamp(0.0, 1.0),
    };
    let bot = (!args.idle).then(|| ScriptedInput::new(args.seed));

    let mut client = Client::new(&args.server, config, conditions, bot, args.seed).await?;
    client.run(args.duration_secs.map(Duration::from_secs)).await?;

    Ok(())
}
