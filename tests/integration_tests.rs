//! Integration tests for the relay server and client sessions
//!
//! These tests run a real server on a loopback port and drive it with real
//! client sessions and raw TCP peers.

use client::session::{connect, ClientSession, SessionEnd};
use server::config::Args;
use server::dispatcher::Server;
use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};

const WAIT: Duration = Duration::from_secs(5);

/// Display that can be inspected while the session owning it is running
#[derive(Clone, Default)]
struct SharedDisplay(Arc<Mutex<Vec<u8>>>);

impl SharedDisplay {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedDisplay {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A client session running in the background, typed into through `keys`
struct TestClient {
    keys: DuplexStream,
    display: SharedDisplay,
    handle: JoinHandle<SessionEnd>,
}

impl TestClient {
    async fn connect(addr: SocketAddr, username: &str) -> Self {
        let stream = connect(addr).await.unwrap();
        let (keys, input) = duplex(1024);
        let display = SharedDisplay::default();

        let mut session = ClientSession::new(username, BufReader::new(input), stream, display.clone());
        let handle = tokio::spawn(async move { session.run().await.unwrap() });

        TestClient {
            keys,
            display,
            handle,
        }
    }

    async fn type_line(&mut self, line: &str) {
        self.keys.write_all(line.as_bytes()).await.unwrap();
    }

    async fn wait_for_display(&self, expected: &str) {
        let deadline = Instant::now() + WAIT;
        while !self.display.contents().contains(expected) {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {:?}, display has {:?}",
                expected,
                self.display.contents()
            );
            sleep(Duration::from_millis(10)).await;
        }
    }
}

struct TestServer {
    addr: SocketAddr,
    log_file: PathBuf,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_file: dir.path().join("serverlog.txt"),
            max_clients: 64,
        };

        let mut server = Server::new(&args).await.unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = server.run().await;
        });

        TestServer {
            addr,
            log_file: args.log_file,
            handle,
            _dir: dir,
        }
    }

    fn log_lines(&self) -> Vec<String> {
        read_lines(&self.log_file)
    }

    fn count_log(&self, needle: &str) -> usize {
        self.log_lines()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }

    async fn wait_for_log(&self, needle: &str, count: usize) {
        let deadline = Instant::now() + WAIT;
        while self.count_log(needle) < count {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {} x {:?} in log: {:?}",
                count,
                needle,
                self.log_lines()
            );
            sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| line.to_string())
        .collect()
}

/// END-TO-END CHAT SCENARIOS
mod chat_tests {
    use super::*;

    /// alice's message reaches bob verbatim and is not echoed to alice
    #[tokio::test]
    async fn message_reaches_other_client_only() {
        let server = TestServer::start().await;

        let mut alice = TestClient::connect(server.addr, "alice").await;
        let bob = TestClient::connect(server.addr, "bob").await;
        server.wait_for_log("Client connected from", 2).await;

        alice.type_line("hello\n").await;
        bob.wait_for_display("alice: hello\n").await;

        sleep(Duration::from_millis(200)).await;
        assert_eq!(bob.display.contents(), "alice: hello\n");
        assert_eq!(alice.display.contents(), "");
    }

    /// After alice quits, exactly one disconnect is logged and bob keeps chatting
    #[tokio::test]
    async fn disconnect_is_logged_once_and_others_continue() {
        let server = TestServer::start().await;

        let mut alice = TestClient::connect(server.addr, "alice").await;
        let mut bob = TestClient::connect(server.addr, "bob").await;
        server.wait_for_log("Client connected from", 2).await;

        alice.type_line("/quit\n").await;
        let end = timeout(WAIT, alice.handle).await.unwrap().unwrap();
        assert_eq!(end, SessionEnd::Quit);

        server.wait_for_log("Socket 1 disconnected", 1).await;

        let mut carol = TestClient::connect(server.addr, "carol").await;
        server.wait_for_log("Client connected from", 3).await;

        bob.type_line("still here\n").await;
        carol.wait_for_display("bob: still here\n").await;

        carol.type_line("welcome back\n").await;
        bob.wait_for_display("carol: welcome back\n").await;

        sleep(Duration::from_millis(100)).await;
        assert_eq!(server.count_log("disconnected"), 1);
        assert_eq!(server.count_log("Socket 1 disconnected"), 1);
        assert!(!alice.display.contents().contains("still here"));
    }

    /// Quit commands never reach the other clients
    #[tokio::test]
    async fn quit_command_is_not_relayed() {
        let server = TestServer::start().await;

        let mut alice = TestClient::connect(server.addr, "alice").await;
        let bob = TestClient::connect(server.addr, "bob").await;
        server.wait_for_log("Client connected from", 2).await;

        alice.type_line("/exit\n").await;
        server.wait_for_log("Socket 1 disconnected", 1).await;

        assert_eq!(bob.display.contents(), "");
        assert_eq!(server.count_log("/exit"), 0);
    }

    /// A client sees the server going away as the end of its session
    #[tokio::test]
    async fn server_shutdown_ends_session() {
        let server = TestServer::start().await;

        let alice = TestClient::connect(server.addr, "alice").await;
        server.wait_for_log("Client connected from", 1).await;

        drop(server);

        let end = timeout(WAIT, alice.handle).await.unwrap().unwrap();
        assert_eq!(end, SessionEnd::ServerClosed);
    }
}

/// RAW RELAY BEHAVIOR TESTS
mod relay_tests {
    use super::*;

    async fn read_exactly(stream: &mut TcpStream, len: usize) -> Vec<u8> {
        let mut buffer = vec![0u8; len];
        timeout(WAIT, stream.read_exact(&mut buffer))
            .await
            .unwrap()
            .unwrap();
        buffer
    }

    async fn assert_silent(stream: &mut TcpStream) {
        let mut buffer = [0u8; 64];
        let read = timeout(Duration::from_millis(100), stream.read(&mut buffer)).await;
        assert!(read.is_err(), "unexpected data: {:?}", read);
    }

    /// Every message from client i reaches all j != i and never i
    #[tokio::test]
    async fn fan_out_to_every_other_client() {
        let server = TestServer::start().await;

        let mut peers = Vec::new();
        for _ in 0..4 {
            peers.push(TcpStream::connect(server.addr).await.unwrap());
        }
        server.wait_for_log("Client connected from", 4).await;

        for sender in 0..peers.len() {
            let message = format!("peer{}: round {}\n", sender, sender);
            peers[sender].write_all(message.as_bytes()).await.unwrap();

            for (receiver, peer) in peers.iter_mut().enumerate() {
                if receiver == sender {
                    continue;
                }
                let received = read_exactly(peer, message.len()).await;
                assert_eq!(received, message.as_bytes());
            }
            assert_silent(&mut peers[sender]).await;
        }
    }

    /// Bytes are relayed unmodified, without adding framing
    #[tokio::test]
    async fn relays_raw_bytes() {
        let server = TestServer::start().await;

        let mut sender = TcpStream::connect(server.addr).await.unwrap();
        let mut receiver = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_log("Client connected from", 2).await;

        let payload = [b'n', b'o', 0x00, 0xfe, b' ', b'n', b'l'];
        sender.write_all(&payload).await.unwrap();

        assert_eq!(read_exactly(&mut receiver, payload.len()).await, payload);
    }

    /// A disconnected client is never written to again
    #[tokio::test]
    async fn broadcasts_skip_disconnected_client() {
        let server = TestServer::start().await;

        let mut alice = TcpStream::connect(server.addr).await.unwrap();
        let bob = TcpStream::connect(server.addr).await.unwrap();
        let mut carol = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_log("Client connected from", 3).await;

        drop(bob);
        server.wait_for_log("Socket 2 disconnected", 1).await;

        for round in 0..3 {
            let message = format!("alice: round {}\n", round);
            alice.write_all(message.as_bytes()).await.unwrap();
            assert_eq!(read_exactly(&mut carol, message.len()).await, message.as_bytes());
        }

        sleep(Duration::from_millis(100)).await;
        assert_eq!(server.count_log("disconnected"), 1);
    }

    /// Log records follow processing order and all carry a timestamp
    #[tokio::test]
    async fn log_is_ordered_and_timestamped() {
        let server = TestServer::start().await;

        let mut alice = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_log("Client connected from", 1).await;
        let mut bob = TcpStream::connect(server.addr).await.unwrap();
        server.wait_for_log("Client connected from", 2).await;

        alice.write_all(b"alice: first\n").await.unwrap();
        read_exactly(&mut bob, 13).await;
        bob.write_all(b"bob: second\n").await.unwrap();
        read_exactly(&mut alice, 12).await;

        drop(alice);
        server.wait_for_log("disconnected", 1).await;

        let lines = server.log_lines();
        assert_eq!(lines.len(), 5, "{:?}", lines);

        let texts: Vec<&str> = lines
            .iter()
            .map(|line| {
                assert!(line.starts_with('['));
                let close = line.find(']').unwrap();
                assert!(close > 1, "empty timestamp in {:?}", line);
                &line[close + 1..]
            })
            .collect();

        assert!(texts[0].starts_with("Client connected from 127.0.0.1 on port "));
        assert!(texts[1].starts_with("Client connected from 127.0.0.1 on port "));
        assert_eq!(texts[2], "alice: first");
        assert_eq!(texts[3], "bob: second");
        assert_eq!(texts[4], "Socket 1 disconnected");
    }
}
