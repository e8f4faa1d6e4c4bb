use clap::Parser;
use shared::DEFAULT_SERVER_PORT;
use std::net::{Ipv4Addr, SocketAddr};

/// Chat relay client
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IPv4 address of the server
    pub address: Ipv4Addr,

    /// Name shown in front of every message you send
    pub username: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,
}

impl Args {
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::from((self.address, self.port))
    }
}
