//! # Chat Relay Server Library
//!
//! This library provides the server half of the chat relay. It accepts TCP
//! connections from any number of clients and relays every chunk of bytes
//! one client sends to all of the other connected clients, unmodified.
//!
//! ## Core Responsibilities
//!
//! ### Connection Tracking
//! Every accepted client is registered in a [`connection_set::ConnectionSet`]
//! under a descriptor that is never reused. A client that disconnects is
//! removed from the set before the dispatcher waits again, so no later
//! broadcast can reach a closed socket.
//!
//! ### Relaying
//! Received chunks are recorded once in the activity log and then fanned out
//! to every member of the set except the sender. The server does not parse,
//! frame, or rewrite messages; the `"name: text"` convention lives entirely
//! in the client.
//!
//! ### Activity Logging
//! Connects, disconnects and relayed messages are appended to a plain text
//! log file with an asctime-style timestamp and echoed to the console.
//!
//! ## Architecture Design
//!
//! ### Single Dispatcher Task
//! One task owns the listener, the connection set and the activity log. It
//! blocks on a single readiness wait per iteration: either the listener has
//! a pending connection or some client produced data or closed. Reader tasks
//! per connection only forward raw chunks over a channel, so all state
//! changes happen sequentially in the dispatcher with no locking.
//!
//! ### Failure Policy
//! Setup failures (bad address, bind, unwritable log file) are returned from
//! [`dispatcher::Server::new`]. A failed accept ends the dispatch loop. A
//! failed write to one recipient drops that recipient and the relay goes on.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::Args;
//! use server::dispatcher::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let args = Args::default();
//!     let mut server = Server::new(&args).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod activity_log;
pub mod broadcast;
pub mod config;
pub mod connection_set;
pub mod dispatcher;
pub mod error;
