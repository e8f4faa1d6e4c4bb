//! Client session: multiplexes the keyboard and the server connection

use crate::framing::LineAssembler;
use log::{debug, info};
use shared::{compose_message, is_quit_command, MAX_CHUNK};
use std::io::{self, Write};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),

    #[error("failed to send message: {0}")]
    Send(#[source] io::Error),

    #[error("failed to receive from server: {0}")]
    Receive(#[source] io::Error),

    #[error("failed to write to display: {0}")]
    Display(#[source] io::Error),
}

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed one of the quit commands
    Quit,
    /// Local input reached end-of-file
    InputClosed,
    /// The server closed the connection
    ServerClosed,
}

/// Which watched source became ready
enum Ready {
    /// Buffered input up to and including the next newline, empty at EOF
    Input(io::Result<Vec<u8>>),
    Peer(io::Result<usize>),
}

/// Copies the buffered input up to the first newline
fn line_segment(available: &[u8]) -> Vec<u8> {
    match available.iter().position(|&byte| byte == b'\n') {
        Some(end) => available[..=end].to_vec(),
        None => available.to_vec(),
    }
}

pub async fn connect(addr: SocketAddr) -> Result<TcpStream, SessionError> {
    info!("Connecting to {}", addr);
    TcpStream::connect(addr)
        .await
        .map_err(|source| SessionError::Connect { addr, source })
}

/// One user's chat session
///
/// Lines read from `input` are prefixed with the username and written to
/// the server; bytes from the server are reassembled into lines and written
/// to `display`.
pub struct ClientSession<I, S, D> {
    username: String,
    input: I,
    stream: S,
    display: D,
    assembler: LineAssembler,
}

impl<I, S, D> ClientSession<I, S, D>
where
    I: AsyncBufRead + Unpin,
    S: AsyncRead + AsyncWrite + Unpin,
    D: Write,
{
    pub fn new(username: impl Into<String>, input: I, stream: S, display: D) -> Self {
        Self {
            username: username.into(),
            input,
            stream,
            display,
            assembler: LineAssembler::new(),
        }
    }

    /// Runs until the user quits, input ends, or the server goes away
    pub async fn run(&mut self) -> Result<SessionEnd, SessionError> {
        // Bytes of the line being typed; input is only consumed once copied here
        let mut line = Vec::new();
        let mut buffer = [0u8; MAX_CHUNK];

        loop {
            let ready = tokio::select! {
                read = self.input.fill_buf() => Ready::Input(read.map(line_segment)),
                read = self.stream.read(&mut buffer) => Ready::Peer(read),
            };

            match ready {
                Ready::Input(read) => {
                    let segment = read.map_err(SessionError::Input)?;
                    if segment.is_empty() {
                        debug!("Input closed");
                        if !line.is_empty() {
                            let rest = String::from_utf8_lossy(&line).into_owned();
                            self.send_line(&rest).await?;
                        }
                        return Ok(SessionEnd::InputClosed);
                    }

                    self.input.consume(segment.len());
                    line.extend_from_slice(&segment);
                    if !line.ends_with(b"\n") {
                        continue;
                    }

                    let typed = String::from_utf8_lossy(&line).into_owned();
                    line.clear();
                    if is_quit_command(&typed) {
                        info!("Quit command received");
                        return Ok(SessionEnd::Quit);
                    }
                    self.send_line(&typed).await?;
                }
                Ready::Peer(read) => {
                    let len = read.map_err(SessionError::Receive)?;
                    if len == 0 {
                        self.flush_pending()?;
                        info!("Server closed the connection");
                        return Ok(SessionEnd::ServerClosed);
                    }
                    self.display_chunk(&buffer[..len])?;
                }
            }
        }
    }

    /// Sends one composed message, never more than `MAX_CHUNK` bytes per write
    async fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        let message = compose_message(&self.username, line);
        for chunk in message.as_bytes().chunks(MAX_CHUNK) {
            self.stream
                .write_all(chunk)
                .await
                .map_err(SessionError::Send)?;
        }
        self.stream.flush().await.map_err(SessionError::Send)
    }

    fn display_chunk(&mut self, chunk: &[u8]) -> Result<(), SessionError> {
        for line in self.assembler.push(chunk) {
            writeln!(self.display, "{}", line).map_err(SessionError::Display)?;
        }
        self.display.flush().map_err(SessionError::Display)
    }

    fn flush_pending(&mut self) -> Result<(), SessionError> {
        if let Some(rest) = self.assembler.finish() {
            writeln!(self.display, "{}", rest).map_err(SessionError::Display)?;
            self.display.flush().map_err(SessionError::Display)?;
        }
        Ok(())
    }
}
