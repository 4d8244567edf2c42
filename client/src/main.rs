//! Companion line-relay client for the trivia server.
//!
//! Trivial by design: one task prints everything the server sends, the main
//! loop forwards stdin lines to the server. All quiz logic lives server-side.

use clap::Parser;
use log::info;
use shared::Command;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(
        short,
        long,
        default_value_t = format!("{}:{}", shared::DEFAULT_HOST, shared::DEFAULT_PORT)
    )]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    info!("Connecting to {}", args.server);
    let stream = TcpStream::connect(&args.server).await?;
    let (read_half, mut write_half) = stream.into_split();

    // Print everything the server sends until it closes the connection
    let receiver = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{}", line);
        }
        println!("Disconnected from server.");
    });

    let mut stdin = BufReader::new(io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        let logging_out = Command::parse(&line) == Command::Logout;
        if write_half.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if write_half.write_all(b"\n").await.is_err() {
            break;
        }
        if logging_out {
            break;
        }
    }

    drop(write_half);
    let _ = receiver.await;
    Ok(())
}
