//! End-to-end protocol tests: real `TcpListener`, real client sockets,
//! driving the same `handle_connection` loop the `server` binary runs.

use std::sync::Arc;
use std::time::Duration;

use checkers_core::handler::handle_connection;
use checkers_core::logger::Logger;
use checkers_core::server::Server;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A running server bound to an ephemeral port, with helpers to connect
/// fresh clients against it.
struct TestServer {
    addr: std::net::SocketAddr,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::new(
            Duration::from_secs(300),
            Box::new(checkers_core::idgen::CountingIdGenerator::default()),
            Arc::new(Logger::new(0)),
        ));

        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                let server = server.clone();
                let log = Arc::new(Logger::new(0));
                tokio::spawn(async move {
                    handle_connection(stream, peer, server, log).await;
                });
            }
        });

        TestServer { addr }
    }

    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        TestClient {
            reader: BufReader::new(reader).lines(),
            writer,
        }
    }
}

struct TestClient {
    reader: tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl TestClient {
    async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{line}\n").as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(1), self.reader.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed unexpectedly")
    }

    /// Drains `n` lines, returning them in arrival order.
    async fn recv_n(&mut self, n: usize) -> Vec<String> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.recv().await);
        }
        out
    }
}

#[tokio::test]
async fn new_then_join_starts_a_game() {
    let server = TestServer::start().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    // `a` is first in, takes the Red seat, and waits for an opponent.
    a.send("NEW").await;
    let a_lines = a.recv_n(4).await;
    assert!(a_lines[0].starts_with("STATUS GAME_ID "));
    let game_id = a_lines[0].strip_prefix("STATUS GAME_ID ").unwrap().to_string();
    assert!(a_lines[1].starts_with("STATUS BOARD "));
    assert_eq!(a_lines[2], "STATUS YOU_ARE red");
    assert_eq!(a_lines[3], "STATUS TURN waiting");
    assert_eq!(a.recv().await, "OK");

    b.send(&format!("JOIN {game_id}")).await;
    let b_lines = b.recv_n(4).await;
    assert!(b_lines[0].starts_with("STATUS GAME_ID "));
    assert!(b_lines[1].starts_with("STATUS BOARD "));
    assert_eq!(b_lines[2], "STATUS YOU_ARE black");
    assert_eq!(b_lines[3], "STATUS TURN black");
    assert_eq!(b.recv().await, "OK");

    // The seat announcement and the now-settled turn reach the first player too.
    assert_eq!(a.recv().await, "STATUS JOINED black");
    assert_eq!(a.recv().await, "STATUS TURN black");
}

#[tokio::test]
async fn move_rejects_out_of_turn_player() {
    let server = TestServer::start().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    a.send("NEW").await;
    let a_lines = a.recv_n(4).await;
    let game_id = a_lines[0].strip_prefix("STATUS GAME_ID ").unwrap().to_string();
    a.recv().await; // OK

    b.send(&format!("JOIN {game_id}")).await;
    b.recv_n(4).await;
    b.recv().await; // OK
    a.recv().await; // STATUS JOINED black
    a.recv().await; // STATUS TURN black

    // `a` is red; black moves first, so a's move must be rejected.
    a.send("MOVE 1 2 0 3").await;
    let resp = a.recv().await;
    assert!(resp.starts_with("ERROR"), "expected rejection, got {resp}");
}

#[tokio::test]
async fn spectator_sees_moves_but_cannot_play() {
    let server = TestServer::start().await;
    let mut red = server.connect().await; // first in, takes Red, waits
    let mut black = server.connect().await; // second in, takes Black, moves first
    let mut watcher = server.connect().await;

    red.send("NEW").await;
    let lines = red.recv_n(4).await;
    let game_id = lines[0].strip_prefix("STATUS GAME_ID ").unwrap().to_string();
    red.recv().await; // OK

    black.send(&format!("JOIN {game_id}")).await;
    black.recv_n(4).await;
    black.recv().await; // OK
    red.recv().await; // STATUS JOINED black
    red.recv().await; // STATUS TURN black

    watcher.send(&format!("SPECTATE {game_id}")).await;
    let watcher_lines = watcher.recv_n(3).await;
    assert!(watcher_lines[0].starts_with("STATUS GAME_ID "));
    assert!(watcher_lines[1].starts_with("STATUS BOARD "));
    assert_eq!(watcher_lines[2], "STATUS TURN black");
    assert_eq!(watcher.recv().await, "OK");

    black.send("MOVE 1 2 0 3").await;
    assert_eq!(black.recv().await, "STATUS MOVED 1 2 0 3");
    assert_eq!(black.recv().await, "STATUS TURN red");
    assert_eq!(black.recv().await, "OK");

    assert_eq!(red.recv().await, "STATUS MOVED 1 2 0 3");
    assert_eq!(red.recv().await, "STATUS TURN red");

    assert_eq!(watcher.recv().await, "STATUS MOVED 1 2 0 3");
    assert_eq!(watcher.recv().await, "STATUS TURN red");

    watcher.send("MOVE 0 3 1 4").await;
    let resp = watcher.recv().await;
    assert!(resp.starts_with("ERROR"), "spectators must not move, got {resp}");
}

#[tokio::test]
async fn list_excludes_the_caller_own_game() {
    let server = TestServer::start().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    a.send("NEW").await;
    a.recv_n(4).await;
    a.recv().await; // OK

    b.send("LIST").await;
    let resp = b.recv().await;
    assert!(resp.starts_with("STATUS LIST "), "got {resp}");
    b.recv().await; // OK

    a.send("LIST").await;
    let resp = a.recv().await;
    assert_eq!(resp, "STATUS LIST", "caller's own open game must not be listed");
}

#[tokio::test]
async fn failed_join_does_not_eject_from_current_game() {
    let server = TestServer::start().await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;

    a.send("NEW").await;
    let a_lines = a.recv_n(4).await;
    let game_id = a_lines[0].strip_prefix("STATUS GAME_ID ").unwrap().to_string();
    a.recv().await; // OK

    b.send(&format!("JOIN {game_id}")).await;
    b.recv_n(4).await;
    b.recv().await; // OK
    a.recv().await; // STATUS JOINED black
    a.recv().await; // STATUS TURN black

    // `a` tries to jump to a nonexistent game; the attempt must fail without
    // touching `a`'s existing seat, so no LEFT/TURN broadcast reaches `b`.
    a.send("JOIN no_such_game").await;
    let resp = a.recv().await;
    assert!(resp.starts_with("ERROR"), "expected rejection, got {resp}");

    // `a` is still seated: a BOARD request must still succeed.
    a.send("BOARD").await;
    let resp = a.recv().await;
    assert!(resp.starts_with("STATUS BOARD "), "got {resp}");
    a.recv().await; // OK

    // `b` must not have seen any LEFT/TURN broadcast from the failed join.
    b.send("BOARD").await;
    let resp = b.recv().await;
    assert!(resp.starts_with("STATUS BOARD "), "got {resp}");
}
