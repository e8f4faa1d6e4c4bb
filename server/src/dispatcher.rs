//! Server dispatcher: accepts clients and relays their messages

use crate::activity_log::ActivityLog;
use crate::broadcast::broadcast;
use crate::config::Args;
use crate::connection_set::{ConnectionSet, ConnectionSetError, Descriptor};
use crate::error::ServerError;
use log::{debug, info, warn};
use shared::{LISTEN_BACKLOG, MAX_CHUNK};
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Messages sent from connection readers to the dispatcher
#[derive(Debug)]
pub enum ServerMessage {
    Received {
        descriptor: Descriptor,
        chunk: Vec<u8>,
    },
    Closed {
        descriptor: Descriptor,
    },
}

/// A watched client
#[derive(Debug)]
struct Connection {
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    reader: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Single-task relay server
///
/// The listener is watched directly by the dispatch loop and is never a
/// member of the connection set, so fan-out can not reach it. Each client
/// has a reader task that forwards raw chunks over one channel; the
/// dispatcher is the only owner of the set and the activity log.
pub struct Server {
    listener: TcpListener,
    connections: ConnectionSet<Connection>,
    activity: ActivityLog,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Opens the activity log and starts listening. Both steps fail fast.
    pub async fn new(args: &Args) -> Result<Self, ServerError> {
        let activity = ActivityLog::open(&args.log_file).map_err(|source| {
            ServerError::ActivityLog {
                path: args.log_file.clone(),
                source,
            }
        })?;

        let listener = Self::listen(&args.address())?;
        info!("Server listening on {}", args.address());

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            connections: ConnectionSet::new(args.max_clients),
            activity,
            server_tx,
            server_rx,
        })
    }

    fn listen(address: &str) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ServerError::Address(address.to_string()))?;
        let listen_error = |source| ServerError::Listen {
            addr: address.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(listen_error)?;

        socket.set_reuseaddr(true).map_err(listen_error)?;
        socket.bind(addr).map_err(listen_error)?;
        socket.listen(LISTEN_BACKLOG).map_err(listen_error)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Descriptors of every connected client, ascending
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.connections.all().collect()
    }

    pub fn watermark(&self) -> Option<Descriptor> {
        self.connections.watermark()
    }

    /// Runs the dispatch loop until accepting a client fails
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Server started successfully");

        loop {
            self.step().await?;
        }
    }

    /// Waits for the next ready source and handles it
    ///
    /// Pending connections are always looked at before client data.
    pub async fn step(&mut self) -> Result<(), ServerError> {
        tokio::select! {
            biased;

            accepted = self.listener.accept() => {
                let (stream, peer) = accepted.map_err(ServerError::Accept)?;
                self.accept_client(stream, peer);
            },

            message = self.server_rx.recv() => {
                // The dispatcher holds a sender itself, so the channel never closes
                if let Some(message) = message {
                    self.handle_message(message).await;
                }
            },
        }

        Ok(())
    }

    fn accept_client(&mut self, stream: TcpStream, peer: SocketAddr) {
        let (reader, writer) = stream.into_split();
        let server_tx = self.server_tx.clone();

        let added = self.connections.add_with(|descriptor| Connection {
            writer,
            peer,
            reader: Self::spawn_connection_reader(descriptor, reader, server_tx),
        });

        match added {
            Ok(descriptor) => {
                debug!("Client {} assigned socket {}", peer, descriptor);
                self.activity.record(&format!(
                    "Client connected from {} on port {}\n",
                    peer.ip(),
                    peer.port()
                ));
            }
            Err(e) => {
                // Both halves were dropped with the closure, closing the socket
                warn!("Refusing client {}: {}", peer, e);
                let reason = match e {
                    ConnectionSetError::Full { .. } => "server full",
                    ConnectionSetError::Exhausted => "no descriptors left",
                };
                self.activity
                    .record(&format!("Connection from {} refused: {}\n", peer, reason));
            }
        }
    }

    /// Spawns the task that forwards everything a client sends
    fn spawn_connection_reader(
        descriptor: Descriptor,
        mut reader: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_CHUNK];

            loop {
                match reader.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(len) => {
                        let message = ServerMessage::Received {
                            descriptor,
                            chunk: buffer[..len].to_vec(),
                        };
                        if server_tx.send(message).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        debug!("Read error on socket {}: {}", descriptor, e);
                        break;
                    }
                }
            }

            let _ = server_tx.send(ServerMessage::Closed { descriptor });
        })
    }

    async fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Received { descriptor, chunk } => {
                self.process_client(descriptor, &chunk).await;
            }
            ServerMessage::Closed { descriptor } => {
                self.disconnect(descriptor);
            }
        }
    }

    /// Records a received chunk once, then relays it to everyone else
    async fn process_client(&mut self, sender: Descriptor, chunk: &[u8]) {
        if !self.connections.contains(sender) {
            debug!("Ignoring {} bytes from dropped socket {}", chunk.len(), sender);
            return;
        }

        self.activity.record(&String::from_utf8_lossy(chunk));

        let recipients: Vec<(Descriptor, &mut OwnedWriteHalf)> = self
            .connections
            .iter_mut()
            .map(|(descriptor, connection)| (descriptor, &mut connection.writer))
            .collect();
        let failed = broadcast(recipients, sender, chunk).await;

        for descriptor in failed {
            self.disconnect(descriptor);
        }
    }

    /// Forgets a client and closes its socket. Only the first call for a
    /// descriptor has any effect.
    fn disconnect(&mut self, descriptor: Descriptor) {
        if !self.connections.contains(descriptor) {
            return;
        }

        self.activity
            .record(&format!("Socket {} disconnected\n", descriptor));

        if let Some(connection) = self.connections.remove(descriptor) {
            debug!("Closed connection to {}", connection.peer);
        }
    }
}
