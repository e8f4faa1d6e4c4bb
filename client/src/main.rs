use clap::Parser;
use client::config::Args;
use client::session::{connect, ClientSession, SessionEnd, SessionError};
use log::{debug, info};
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    // Wrong argument count prints usage and exits non-zero
    let args = Args::parse();

    env_logger::init();

    match run(args).await {
        Ok(SessionEnd::Quit) | Ok(SessionEnd::InputClosed) => {}
        Ok(SessionEnd::ServerClosed) => {
            println!("Connection closed by server.");
            // A blocking stdin read may still be pending; don't wait for it
            std::process::exit(1);
        }
        Err(e) => {
            debug!("{:?}", e);
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<SessionEnd, SessionError> {
    let stream = connect(args.server_addr()).await?;

    println!("Successfully connected to {}.", args.address);
    println!("You may begin typing at any time.\n");
    info!("Chatting as {}", args.username);

    let input = BufReader::new(tokio::io::stdin());
    let mut session = ClientSession::new(args.username, input, stream, std::io::stdout());
    session.run().await
}
