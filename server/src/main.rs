use clap::Parser;
use log::{error, info};
use server::config::Args;
use server::dispatcher::Server;

/// Main-method of the application.
/// Parses command-line arguments, prints the banner and runs the dispatcher
/// until the process is interrupted or accepting a client fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut server = Server::new(&args).await?;

    println!("Terminate server at any time with CTRL + c.");
    println!("Current port: {}", server.local_addr()?.port());
    println!("Waiting for clients to connect...");
    info!("Activity is logged to {}", args.log_file.display());

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
