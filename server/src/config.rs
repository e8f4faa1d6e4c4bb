use clap::Parser;
use shared::{DEFAULT_SERVER_PORT, LOG_FILE_NAME};
use std::path::PathBuf;

/// Chat relay server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,

    /// Activity log file, appended to on every connect, disconnect and message
    #[arg(short, long, default_value = LOG_FILE_NAME)]
    pub log_file: PathBuf,

    /// Maximum number of clients watched at once
    #[arg(short, long, default_value_t = 1024)]
    pub max_clients: usize,
}

impl Args {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_SERVER_PORT,
            log_file: PathBuf::from(LOG_FILE_NAME),
            max_clients: 1024,
        }
    }
}
