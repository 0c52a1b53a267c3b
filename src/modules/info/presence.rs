use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::host::PlayerInfo;
use crate::modules::teleport::directive::Position;

/// Online players as seen in join/leave console lines.
///
/// Only trustworthy once a server start has been observed; before that it
/// answers "unknown" so RCON gets asked instead.
#[derive(Debug, Default)]
pub struct LogPresence {
    players: DashMap<String, String>,
    synced: AtomicBool,
}

impl LogPresence {
    pub fn server_started(&self) {
        self.players.clear();
        self.synced.store(true, Ordering::SeqCst);
    }

    pub fn server_stopped(&self) {
        self.synced.store(false, Ordering::SeqCst);
        self.players.clear();
    }

    pub fn joined(&self, player: &str) {
        self.players
            .insert(player.to_ascii_lowercase(), player.to_string());
    }

    pub fn left(&self, player: &str) {
        self.players.remove(&player.to_ascii_lowercase());
    }
}

#[async_trait]
impl PlayerInfo for LogPresence {
    fn name(&self) -> &str {
        "console log"
    }

    async fn online_players(&self) -> Option<Vec<String>> {
        if !self.synced.load(Ordering::SeqCst) {
            return None;
        }
        let mut players: Vec<String> = self
            .players
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        players.sort();
        Some(players)
    }

    async fn position(&self, _player: &str) -> Option<Position> {
        None
    }
}
