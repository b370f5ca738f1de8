//! Per-game session state: seat lifecycle, turn gating, observer broadcast,
//! and the idle timestamp the server registry's reaper reads.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::board::{Board, Player, DEFAULT_DIM};
use crate::error::GameError;
use crate::protocol::status;

/// Identifies one attached connection across seat/spectator lookups. A peer
/// socket address is unique for the lifetime of a connection and doubles as
/// a cheap, `Copy` key.
pub type HandlerId = SocketAddr;

/// A connection's outgoing half, shared between its own command-ack writes
/// and any game broadcasting a status line to it.
#[derive(Clone)]
pub struct Handle {
    pub id: HandlerId,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl Handle {
    pub fn new(id: HandlerId, writer: Arc<Mutex<OwnedWriteHalf>>) -> Self {
        Self { id, writer }
    }

    pub async fn send_line(&self, line: &str) -> std::io::Result<()> {
        let mut w = self.writer.lock().await;
        w.write_all(line.as_bytes()).await?;
        w.write_all(b"\r\n").await?;
        w.flush().await
    }
}

pub struct Game {
    id: String,
    board: Board,
    seats: HashMap<Player, Option<Handle>>,
    spectators: Vec<Handle>,
    last_interaction: Instant,
}

impl Game {
    pub fn new(id: String) -> Self {
        let mut board = Board::new(DEFAULT_DIM);
        for (player, x, y) in board.start_positions() {
            board.add_piece(player, (x, y)).expect("fresh start position");
        }
        let mut seats = HashMap::new();
        seats.insert(Player::Black, None);
        seats.insert(Player::Red, None);
        Game {
            id,
            board,
            seats,
            spectators: Vec::new(),
            last_interaction: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn touch(&mut self) {
        self.last_interaction = Instant::now();
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    pub fn open_seats(&self) -> Vec<Player> {
        [Player::Red, Player::Black]
            .into_iter()
            .filter(|p| self.seats[p].is_none())
            .collect()
    }

    pub fn winner(&self) -> Option<Player> {
        self.board.winner()
    }

    /// `waiting` if any seat is open, else the board's current turn.
    pub fn turn_label(&self) -> String {
        if !self.open_seats().is_empty() {
            "waiting".to_string()
        } else {
            self.board.turn.to_string()
        }
    }

    fn attached(&self) -> Vec<Handle> {
        let mut out: Vec<Handle> = self.seats.values().flatten().cloned().collect();
        out.extend(self.spectators.iter().cloned());
        out
    }

    /// Delivers `message` to every attached handler passing both `include`
    /// and `exclude` filters. Broadcasting happens while the caller holds
    /// this game's mutex (the game is always accessed through
    /// `Arc<tokio::sync::Mutex<Game>>`), so a slow peer can stall the rest —
    /// an accepted trade-off at this scale.
    async fn send_status(
        &mut self,
        message: &str,
        include: Option<&[HandlerId]>,
        exclude: Option<&[HandlerId]>,
    ) {
        let mut failed = Vec::new();
        for handle in self.attached() {
            if include.is_some_and(|set| !set.contains(&handle.id)) {
                continue;
            }
            if exclude.is_some_and(|set| set.contains(&handle.id)) {
                continue;
            }
            if handle.send_line(message).await.is_err() {
                failed.push(handle.id);
            }
        }
        for id in failed {
            self.leave(id);
        }
    }

    pub fn join(&mut self, handle: Handle) -> Result<Player, GameError> {
        let open = self.open_seats();
        let player = *open
            .first()
            .ok_or_else(|| GameError::protocol("no available seats"))?;
        self.seats.insert(player, Some(handle));
        self.touch();
        Ok(player)
    }

    /// Emits the seating status burst. Split from `join` so the caller can
    /// assign the seat synchronously and then broadcast without holding two
    /// different kinds of borrow at once.
    pub async fn announce_join(&mut self, handle: &Handle, player: Player) {
        let joining = [handle.id];
        handle.send_line(&status::game_id(&self.id)).await.ok();
        handle.send_line(&status::board(&self.board.to_wire())).await.ok();
        self.send_status(&status::joined(player), None, Some(&joining)).await;
        handle.send_line(&status::you_are(player)).await.ok();
        let turn = self.turn_label();
        self.send_status(&status::turn(&turn), None, None).await;
    }

    pub async fn spectate(&mut self, handle: Handle) {
        if !self.spectators.iter().any(|h| h.id == handle.id) {
            self.spectators.push(handle.clone());
            self.touch();
            handle.send_line(&status::game_id(&self.id)).await.ok();
            handle
                .send_line(&status::board(&self.board.to_wire()))
                .await
                .ok();
            let turn = self.turn_label();
            handle.send_line(&status::turn(&turn)).await.ok();
        }
    }

    /// Clears any seat held by `id` and removes it from spectators. Safe to
    /// call even if `id` is not attached.
    pub fn leave(&mut self, id: HandlerId) {
        for occupant in self.seats.values_mut() {
            if occupant.as_ref().is_some_and(|h| h.id == id) {
                *occupant = None;
            }
        }
        self.spectators.retain(|h| h.id != id);
    }

    /// Runs `leave` and announces it to everyone still attached.
    pub async fn leave_and_announce(&mut self, id: HandlerId) {
        let left_player = [Player::Red, Player::Black]
            .into_iter()
            .find(|p| self.seats[p].as_ref().is_some_and(|h| h.id == id));
        self.leave(id);
        self.touch();
        if let Some(player) = left_player {
            let exclude = [id];
            self.send_status(&status::left(player), None, Some(&exclude)).await;
            let turn = self.turn_label();
            self.send_status(&status::turn(&turn), None, Some(&exclude)).await;
        }
    }

    pub fn board_wire(&self) -> String {
        self.board.to_wire()
    }

    pub async fn make_move(
        &mut self,
        src: (i32, i32),
        dst: (i32, i32),
        player: Player,
    ) -> Result<(), GameError> {
        if !self.open_seats().is_empty() {
            return Err(GameError::rules("waiting for player"));
        }
        if !self.board.contains(src) {
            return Err(GameError::rules("invalid move source"));
        }
        if self.board.piece_at(src).unwrap().player != player {
            return Err(GameError::rules("not your piece"));
        }

        let was_king = self.board.is_king(src);
        let captured = self.board.do_move(src, dst)?;
        self.touch();

        self.send_status(&status::moved(src, dst), None, None).await;
        if let Some(capture_loc) = captured {
            self.send_status(&status::captured(capture_loc), None, None).await;
        }
        if !was_king && self.board.is_king(dst) {
            self.send_status(&status::king(dst), None, None).await;
        }
        let turn = self.turn_label();
        self.send_status(&status::turn(&turn), None, None).await;
        if let Some(winner) = self.winner() {
            self.send_status(&status::winner(winner), None, None).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_game_waits_for_second_seat() {
        let game = Game::new("test_game".to_string());
        assert_eq!(game.turn_label(), "waiting");
        assert_eq!(game.open_seats(), vec![Player::Red, Player::Black]);
    }
}
