//! Everything the teleport core needs from the running Minecraft server.
//!
//! The tracker and the command layer only see the [`Host`] and [`PlayerInfo`]
//! traits; the RCON-backed implementations live in [`bridge`].

pub mod bridge;
pub mod console;
pub mod messages;
#[cfg(test)]
pub mod mock;
pub mod rcon;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::modules::teleport::directive::Position;

pub use rcon::RconError;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("RCON error: {0}")]
    Rcon(#[from] RconError),
    #[error("server is not running")]
    NotRunning,
}

/// Outbound capabilities: messaging players and running server commands.
#[async_trait]
pub trait Host: Send + Sync + Debug {
    /// Sends `message` to `player`. `message` is a translation key; unknown keys
    /// are delivered verbatim.
    async fn tell(&self, player: &str, message: &str) -> Result<(), HostError>;

    /// Runs a server command. Output is not consulted.
    async fn execute(&self, command: &str) -> Result<(), HostError>;

    fn is_server_running(&self) -> bool;
}

/// A source of player presence and location. `None` always means "unknown",
/// never "offline".
#[async_trait]
pub trait PlayerInfo: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn online_players(&self) -> Option<Vec<String>>;

    async fn position(&self, player: &str) -> Option<Position>;
}

/// Whether the Minecraft server is up, as observed on the console.
#[derive(Debug, Clone, Default)]
pub struct ServerStatus(Arc<AtomicBool>);

impl ServerStatus {
    pub fn new(running: bool) -> Self {
        Self(Arc::new(AtomicBool::new(running)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.0.store(running, Ordering::SeqCst);
    }
}
