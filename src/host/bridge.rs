use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{messages, rcon::RconClient, Host, HostError, PlayerInfo, ServerStatus};
use crate::modules::teleport::directive::{Point3D, Position};

/// Talks to the server over RCON: `tellraw` for messages, raw commands for directives.
#[derive(Debug, Clone)]
pub struct RconHost {
    rcon: Arc<RconClient>,
    status: ServerStatus,
}

impl RconHost {
    pub fn new(rcon: Arc<RconClient>, status: ServerStatus) -> Self {
        Self { rcon, status }
    }

    async fn query(&self, command: &str) -> Result<String, HostError> {
        if !self.status.is_running() {
            return Err(HostError::NotRunning);
        }
        Ok(self.rcon.query(command).await?)
    }
}

pub fn tellraw_command(player: &str, text: &str) -> String {
    format!("tellraw {} {}", player, json!({ "text": text }))
}

#[async_trait]
impl Host for RconHost {
    async fn tell(&self, player: &str, message: &str) -> Result<(), HostError> {
        let command = tellraw_command(player, messages::render(message));
        self.query(&command).await?;
        Ok(())
    }

    async fn execute(&self, command: &str) -> Result<(), HostError> {
        let output = self.query(command).await?;
        debug!("{} -> {}", command, output);
        Ok(())
    }

    fn is_server_running(&self) -> bool {
        self.status.is_running()
    }
}

/// Presence and position straight from the server via `list` and `data get entity`.
#[derive(Debug, Clone)]
pub struct RconInfo {
    rcon: Arc<RconClient>,
    status: ServerStatus,
}

impl RconInfo {
    pub fn new(rcon: Arc<RconClient>, status: ServerStatus) -> Self {
        Self { rcon, status }
    }

    async fn query(&self, command: &str) -> Option<String> {
        if !self.status.is_running() {
            debug!("Server stopped, skipping `{}`", command);
            return None;
        }
        match self.rcon.query(command).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("RCON query `{}` failed: {}", command, e);
                None
            }
        }
    }
}

#[async_trait]
impl PlayerInfo for RconInfo {
    fn name(&self) -> &str {
        "rcon"
    }

    async fn online_players(&self) -> Option<Vec<String>> {
        parse_player_list(&self.query("list").await?)
    }

    async fn position(&self, player: &str) -> Option<Position> {
        let pos = self.query(&format!("data get entity {} Pos", player)).await?;
        let point = parse_point(entity_data(&pos)?)?;
        let dimension = self
            .query(&format!("data get entity {} Dimension", player))
            .await
            .as_deref()
            .and_then(entity_data)
            .and_then(parse_dimension);

        Some(Position { point, dimension })
    }
}

/// `There are 2 of a max of 20 players online: Alice, Bob`
/// (or the pre-1.13 `There are 2/20 players online:` followed by names).
pub fn parse_player_list(body: &str) -> Option<Vec<String>> {
    let (_, names) = body.split_once("online:")?;
    Some(
        names
            .split([',', '\n'])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// `Alice has the following entity data: <value>`
pub fn entity_data(body: &str) -> Option<&str> {
    body.split_once("entity data: ").map(|(_, value)| value.trim())
}

/// `[12.5d, 64.0d, -3.2d]`
pub fn parse_point(value: &str) -> Option<Point3D> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    let coords: Vec<f64> = inner
        .split(',')
        .map(|c| c.trim().trim_end_matches(['d', 'D']).parse().ok())
        .collect::<Option<_>>()?;
    match coords[..] {
        [x, y, z] => Some(Point3D { x, y, z }),
        _ => None,
    }
}

/// `"minecraft:overworld"`, or the numeric ids used before 1.16.
pub fn parse_dimension(value: &str) -> Option<String> {
    let value = value.trim_matches('"');
    let dimension = match value {
        "" => return None,
        "0" => "minecraft:overworld",
        "-1" => "minecraft:the_nether",
        "1" => "minecraft:the_end",
        other => other,
    };
    Some(dimension.to_string())
}
