//! Process-wide game registry: game directory, open/unfinished filters, and
//! the idle-game reaper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};

use crate::error::GameError;
use crate::game::{Game, Handle};
use crate::idgen::GameIdGenerator;
use crate::logger::Logger;

pub type SharedGame = Arc<Mutex<Game>>;

pub struct Server {
    games: Mutex<HashMap<String, SharedGame>>,
    idle_threshold: Duration,
    id_gen: Box<dyn GameIdGenerator>,
    log: Arc<Logger>,
    shutdown_requested: Notify,
}

impl Server {
    pub fn new(idle_threshold: Duration, id_gen: Box<dyn GameIdGenerator>, log: Arc<Logger>) -> Self {
        Server {
            games: Mutex::new(HashMap::new()),
            idle_threshold,
            id_gen,
            log,
            shutdown_requested: Notify::new(),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.notify_waiters();
    }

    pub async fn wait_for_shutdown(&self) {
        self.shutdown_requested.notified().await;
    }

    /// Sweeps games idle longer than the configured threshold. Called at the
    /// top of every directory read, matching the reference's "reap on list"
    /// behavior — reaping is best-effort and may race with a concurrent move.
    async fn reap(&self) {
        let now = Instant::now();
        let mut games = self.games.lock().await;
        let mut to_drop = Vec::new();
        for (id, game) in games.iter() {
            let last = game.lock().await.last_interaction();
            if now.duration_since(last) > self.idle_threshold {
                to_drop.push(id.clone());
            }
        }
        for id in to_drop {
            games.remove(&id);
            self.log.info(format!("reaped idle game {id}"));
        }
    }

    async fn all_games(&self) -> Vec<SharedGame> {
        self.reap().await;
        self.games.lock().await.values().cloned().collect()
    }

    pub async fn get_open_games(&self) -> Vec<String> {
        let mut out = Vec::new();
        for game in self.all_games().await {
            let g = game.lock().await;
            if !g.open_seats().is_empty() && g.winner().is_none() {
                out.push(g.id().to_string());
            }
        }
        out
    }

    pub async fn get_unfinished_games(&self) -> Vec<String> {
        let mut out = Vec::new();
        for game in self.all_games().await {
            let g = game.lock().await;
            if g.winner().is_none() {
                out.push(g.id().to_string());
            }
        }
        out
    }

    pub async fn new_game(&self, handle: Handle) -> Result<(SharedGame, crate::board::Player), GameError> {
        let id = self.id_gen.next_id();
        let game = Arc::new(Mutex::new(Game::new(id.clone())));
        self.games.lock().await.insert(id.clone(), game.clone());
        self.log.info(format!("created game {id}"));
        self.join_game(&id, handle).await
    }

    pub async fn join_game(
        &self,
        id: &str,
        handle: Handle,
    ) -> Result<(SharedGame, crate::board::Player), GameError> {
        let game = self
            .games
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::protocol("game not available"))?;
        let player = {
            let mut g = game.lock().await;
            let player = g.join(handle.clone())?;
            g.announce_join(&handle, player).await;
            player
        };
        Ok((game, player))
    }

    pub async fn spectate_game(&self, id: &str, handle: Handle) -> Result<SharedGame, GameError> {
        let game = self
            .games
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::protocol("game not available"))?;
        game.lock().await.spectate(handle).await;
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idgen::CountingIdGenerator;
    use std::net::SocketAddr;

    fn server() -> Server {
        Server::new(
            Duration::from_secs(300),
            Box::new(CountingIdGenerator::default()),
            Arc::new(Logger::new(0)),
        )
    }

    #[tokio::test]
    async fn join_unknown_game_fails() {
        let s = server();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let result = s.join_game("nonexistent", dummy_handle(addr)).await;
        assert!(result.is_err());
    }

    /// Constructing a `Handle` needs an `OwnedWriteHalf<TcpStream>`; build one
    /// from a loopback pair so registry-only tests can run without a full
    /// server accept loop.
    fn dummy_handle(addr: SocketAddr) -> Handle {
        use std::net::TcpListener as StdListener;
        let listener = StdListener::bind("127.0.0.1:0").unwrap();
        let local_addr = listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(local_addr).unwrap();
        let (_server_side, _) = listener.accept().unwrap();
        client.set_nonblocking(true).unwrap();
        let stream = tokio::net::TcpStream::from_std(client).unwrap();
        let (_r, w) = stream.into_split();
        Handle::new(addr, Arc::new(Mutex::new(w)))
    }
}
