//! Join a server, print chat to the terminal and send stdin lines as chat
//!
//! Run with: cargo run --bin mc-chat -- [host[:port]] --username NAME

use std::time::Duration;

use clap::Parser;
use mcclient::{ansi_escapes, ping, strip_escapes, ClientBuilder, GameEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mc-chat")]
#[command(about = "Minecraft 1.3.2 chat client")]
struct Args {
    /// Server address, host[:port]
    #[arg(default_value = "127.0.0.1")]
    address: String,

    #[arg(long, short, default_value = "RustBot")]
    username: String,

    /// Account password; omit to join in offline mode
    #[arg(long)]
    password: Option<String>,

    /// Keep chunk data in memory
    #[arg(long)]
    retain_world: bool,

    /// Trace every packet
    #[arg(long)]
    log_packets: bool,

    /// Only print the server list entry
    #[arg(long)]
    ping: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if args.ping {
        let listing = ping(&args.address, Duration::from_secs(10)).await?;
        println!(
            "{} ({}/{})",
            ansi_escapes(&listing.motd),
            listing.players_online,
            listing.players_max
        );
        return Ok(());
    }

    let builder = ClientBuilder::new()
        .retain_world(args.retain_world)
        .log_packets(args.log_packets);
    let mut client = match &args.password {
        Some(password) => builder.login(&args.username, password).await?,
        None => builder.offline(&args.username),
    };

    client.set_event_handler(|event: GameEvent| match event {
        GameEvent::Chat { message } => println!("{}", ansi_escapes(&message)),
        GameEvent::PluginMessage { channel, data } => {
            eprintln!("[{}] {} bytes", channel, data.len())
        }
        _ => {}
    });

    if let Some(mut errors) = client.take_errors() {
        tokio::spawn(async move {
            while let Some(e) = errors.recv().await {
                eprintln!("error: {}", e);
            }
        });
    }

    client.join(&args.address).await?;
    eprintln!("Joined {} as {}", args.address, client.session().username);

    if let Some(chat) = client.chat_sender() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = chat.chat(&line).await {
                    eprintln!("chat failed: {}", e);
                    break;
                }
            }
        });
    }

    match client.run().await {
        Ok(reason) => eprintln!("Kicked: {}", strip_escapes(&reason)),
        Err(e) => eprintln!("Disconnected: {}", e),
    }

    client.logout().await;
    Ok(())
}
