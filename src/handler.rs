//! Per-client protocol state machine: command dispatch and disconnect
//! cleanup. One instance of this runs as its own task per TCP connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::board::Player;
use crate::error::GameError;
use crate::game::Handle;
use crate::logger::Logger;
use crate::protocol::{status, Command};
use crate::server::{Server, SharedGame};

/// What a connection is currently doing. `LEAVE`, disconnect, and switching
/// games via `JOIN`/`SPECTATE` all route through here.
enum Attachment {
    Unattached,
    Seated { game: SharedGame, player: Player, id: String },
    Spectating { game: SharedGame, id: String },
}

impl Attachment {
    fn current_game_id(&self) -> Option<&str> {
        match self {
            Attachment::Unattached => None,
            Attachment::Seated { id, .. } => Some(id),
            Attachment::Spectating { id, .. } => Some(id),
        }
    }
}

enum Outcome {
    Continue,
    Quit,
}

pub enum Event<'a> {
    Connected { addr: SocketAddr },
    Disconnected { addr: SocketAddr },
    CommandError { addr: SocketAddr, reason: &'a str },
}

impl std::fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Connected { addr } => write!(f, "{addr} connected"),
            Event::Disconnected { addr } => write!(f, "{addr} disconnected"),
            Event::CommandError { addr, reason } => write!(f, "{addr} error: {reason}"),
        }
    }
}

pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, server: Arc<Server>, log: Arc<Logger>) {
    log.info(Event::Connected { addr });

    let (read_half, write_half) = stream.into_split();
    let writer = Arc::new(Mutex::new(write_half));
    let handle = Handle::new(addr, writer);

    let mut attachment = Attachment::Unattached;
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        log.verbose(format!("{addr} => {line}"));

        let outcome = match dispatch(line, &handle, &mut attachment, &server).await {
            Ok(outcome) => {
                if handle.send_line("OK").await.is_err() {
                    break;
                }
                outcome
            }
            Err(e) => {
                log.verbose(Event::CommandError {
                    addr,
                    reason: e.message(),
                });
                if handle.send_line(&format!("ERROR {}", e.message())).await.is_err() {
                    break;
                }
                Outcome::Continue
            }
        };

        if matches!(outcome, Outcome::Quit) {
            break;
        }
    }

    cleanup(&attachment, addr).await;
    log.info(Event::Disconnected { addr });
}

async fn cleanup(attachment: &Attachment, addr: SocketAddr) {
    match attachment {
        Attachment::Seated { game, .. } | Attachment::Spectating { game, .. } => {
            game.lock().await.leave_and_announce(addr).await;
        }
        Attachment::Unattached => {}
    }
}

async fn dispatch(
    line: &str,
    handle: &Handle,
    attachment: &mut Attachment,
    server: &Arc<Server>,
) -> Result<Outcome, GameError> {
    let command = Command::parse(line)?;

    match command {
        Command::New => {
            if !matches!(attachment, Attachment::Unattached) {
                return Err(GameError::protocol("already playing a game"));
            }
            let (game, player) = server.new_game(handle.clone()).await?;
            let id = game.lock().await.id().to_string();
            *attachment = Attachment::Seated { game, player, id };
            Ok(Outcome::Continue)
        }
        Command::Join(game_id) => {
            let (game, player) = server.join_game(&game_id, handle.clone()).await?;
            leave_current(attachment, handle.id).await;
            let id = game.lock().await.id().to_string();
            *attachment = Attachment::Seated { game, player, id };
            Ok(Outcome::Continue)
        }
        Command::Spectate(game_id) => {
            let game = server.spectate_game(&game_id, handle.clone()).await?;
            leave_current(attachment, handle.id).await;
            let id = game.lock().await.id().to_string();
            *attachment = Attachment::Spectating { game, id };
            Ok(Outcome::Continue)
        }
        Command::List { spectate } => {
            let ids = if spectate {
                server.get_unfinished_games().await
            } else {
                server.get_open_games().await
            };
            let current = attachment.current_game_id();
            let filtered: Vec<String> = ids
                .into_iter()
                .filter(|id| Some(id.as_str()) != current)
                .collect();
            handle
                .send_line(&status::list(spectate, &filtered))
                .await
                .map_err(|_| GameError::protocol("write failed"))?;
            Ok(Outcome::Continue)
        }
        Command::Leave => {
            if matches!(attachment, Attachment::Unattached) {
                return Err(GameError::protocol("not playing a game"));
            }
            leave_current(attachment, handle.id).await;
            *attachment = Attachment::Unattached;
            Ok(Outcome::Continue)
        }
        Command::Board => {
            let game = current_game(attachment)?;
            let wire = game.lock().await.board_wire();
            handle
                .send_line(&status::board(&wire))
                .await
                .map_err(|_| GameError::protocol("write failed"))?;
            Ok(Outcome::Continue)
        }
        Command::Move { src, dst } => {
            let (game, player) = match attachment {
                Attachment::Seated { game, player, .. } => (game, *player),
                _ => return Err(GameError::protocol("not playing a game")),
            };
            game.lock().await.make_move(src, dst, player).await?;
            Ok(Outcome::Continue)
        }
        Command::Turn => {
            let game = current_game(attachment)?;
            let turn = game.lock().await.turn_label();
            handle
                .send_line(&status::turn(&turn))
                .await
                .map_err(|_| GameError::protocol("write failed"))?;
            Ok(Outcome::Continue)
        }
        Command::Quit => Ok(Outcome::Quit),
        Command::Shutdown => {
            server.request_shutdown();
            Ok(Outcome::Continue)
        }
    }
}

fn current_game(attachment: &Attachment) -> Result<&SharedGame, GameError> {
    match attachment {
        Attachment::Seated { game, .. } | Attachment::Spectating { game, .. } => Ok(game),
        Attachment::Unattached => Err(GameError::protocol("not playing a game")),
    }
}

async fn leave_current(attachment: &mut Attachment, id: SocketAddr) {
    if let Attachment::Seated { game, .. } | Attachment::Spectating { game, .. } = attachment {
        game.lock().await.leave_and_announce(id).await;
    }
    *attachment = Attachment::Unattached;
}
