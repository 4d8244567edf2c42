use clap::Parser;
use log::{error, info};
use server::network::Server;
use server::question_bank::QuestionBank;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = shared::DEFAULT_HOST)]
    host: String,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Path to the pre-generated question dataset (CSV)
    #[arg(short, long, default_value = "questions.csv")]
    questions: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // A bad dataset is fatal: no partial bank is ever served
    let bank = QuestionBank::load(&args.questions)?;

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, bank).await?;
    let shutdown = server.shutdown_handle();

    // Ctrl+C begins graceful shutdown: stop accepting, notify sessions,
    // fold partial scores, release the listener.
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                shutdown.signal();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    server.run().await?;
    Ok(())
}
