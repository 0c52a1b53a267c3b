use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Host, HostError, PlayerInfo, RconError};
use crate::modules::teleport::directive::Position;

/// Records everything sent to the server.
#[derive(Debug)]
pub struct MockHost {
    pub told: Mutex<Vec<(String, String)>>,
    pub executed: Mutex<Vec<String>>,
    pub running: AtomicBool,
    pub failing: AtomicBool,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            told: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        }
    }
}

impl MockHost {
    pub fn told(&self) -> Vec<(String, String)> {
        self.told.lock().unwrap().clone()
    }

    pub fn told_to(&self, player: &str) -> Vec<String> {
        self.told()
            .into_iter()
            .filter(|(p, _)| p == player)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), HostError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HostError::Rcon(RconError::Closed));
        }
        Ok(())
    }
}

#[async_trait]
impl Host for MockHost {
    async fn tell(&self, player: &str, message: &str) -> Result<(), HostError> {
        self.check()?;
        self.told
            .lock()
            .unwrap()
            .push((player.to_string(), message.to_string()));
        Ok(())
    }

    async fn execute(&self, command: &str) -> Result<(), HostError> {
        self.check()?;
        self.executed.lock().unwrap().push(command.to_string());
        Ok(())
    }

    fn is_server_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A fixed answer for presence and position queries.
#[derive(Debug, Default)]
pub struct MockInfo {
    pub online: Option<Vec<String>>,
    pub position: Option<Position>,
}

#[async_trait]
impl PlayerInfo for MockInfo {
    fn name(&self) -> &str {
        "mock"
    }

    async fn online_players(&self) -> Option<Vec<String>> {
        self.online.clone()
    }

    async fn position(&self, _player: &str) -> Option<Position> {
        self.position.clone()
    }
}
