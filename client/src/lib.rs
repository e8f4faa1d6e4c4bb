//! # Chat Relay Client Library
//!
//! Client half of the chat relay. A session watches two sources at once:
//! the local keyboard and the connection to the server.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The two-source loop. A typed line is prefixed with the username and sent
//! to the server, unless it is one of the quit commands, which end the
//! session without sending anything. Data from the server is displayed.
//!
//! ### Framing Module (`framing`)
//! The server relays raw byte chunks with no record boundaries, so a single
//! read may hold part of a message or several messages. The
//! [`framing::LineAssembler`] buffers those chunks and only releases whole
//! lines for display.
//!
//! ### Config Module (`config`)
//! Command-line arguments: `client <ADDRESS> <USERNAME> [--port PORT]`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::session::{connect, ClientSession};
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = connect("127.0.0.1:9877".parse()?).await?;
//!     let input = BufReader::new(tokio::io::stdin());
//!
//!     let mut session = ClientSession::new("alice", input, stream, std::io::stdout());
//!     let end = session.run().await?;
//!     println!("Session ended: {:?}", end);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod framing;
pub mod session;
