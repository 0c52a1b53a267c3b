//! Pure construction of teleport commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::TeleportKind;
use crate::error::MtpError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl fmt::Display for Point3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// A coordinate, optionally pinned to a dimension such as `minecraft:the_nether`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub point: Point3D,
    pub dimension: Option<String>,
}

impl Position {
    pub fn new(point: Point3D, dimension: Option<String>) -> Self {
        Self { point, dimension }
    }
}

/// A single command the server can run verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive(String);

impl Directive {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn require(identity: &str, what: &str) -> Result<(), MtpError> {
    if identity.trim().is_empty() {
        return Err(MtpError::Validation(format!("missing {}", what)));
    }
    Ok(())
}

/// Ask moves `requesting` to `target`; invite moves `target` to `requesting`.
pub fn between_players(
    kind: TeleportKind,
    requesting: &str,
    target: &str,
) -> Result<Directive, MtpError> {
    require(requesting, "requesting player")?;
    require(target, "target player")?;

    let (moved, destination) = match kind {
        TeleportKind::Ask => (requesting, target),
        TeleportKind::Invite => (target, requesting),
    };
    Ok(Directive(format!("tp {} {}", moved, destination)))
}

/// Builds a teleport of one player to an absolute position.
#[derive(Debug, Clone, Default)]
pub struct TeleportPosition {
    target: Option<String>,
    position: Option<Position>,
}

impl TeleportPosition {
    pub fn new(target: impl Into<String>, position: Position) -> Self {
        Self {
            target: Some(target.into()),
            position: Some(position),
        }
    }

    pub fn set_target(&mut self, target: impl Into<String>) -> &mut Self {
        self.target = Some(target.into());
        self
    }

    pub fn set_position(&mut self, position: Position) -> &mut Self {
        self.position = Some(position);
        self
    }

    pub fn directive(&self) -> Result<Directive, MtpError> {
        let target = self
            .target
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MtpError::Validation("missing target player".into()))?;
        let position = self
            .position
            .as_ref()
            .ok_or_else(|| MtpError::Validation("missing position".into()))?;

        Ok(match &position.dimension {
            Some(dimension) => Directive(format!(
                "execute in {} run tp {} {}",
                dimension, target, position.point
            )),
            None => {
                warn!(
                    "No dimension given, {} is teleported within the current dimension",
                    target
                );
                Directive(format!("tp {} {}", target, position.point))
            }
        })
    }
}

/// Where a direct (unconfirmed) teleport sends a player.
#[derive(Debug, Clone, PartialEq)]
pub enum TeleportTarget {
    Player(String),
    Position(Position),
}

impl TeleportTarget {
    pub fn directive_for(&self, player: &str) -> Result<Directive, MtpError> {
        match self {
            TeleportTarget::Player(other) => between_players(TeleportKind::Ask, player, other),
            TeleportTarget::Position(position) => {
                TeleportPosition::new(player, position.clone()).directive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Point3D {
        Point3D {
            x: 12.0,
            y: 64.0,
            z: 35.5,
        }
    }

    #[test]
    fn ask_moves_requester_to_target() {
        let d = between_players(TeleportKind::Ask, "Alice", "Bob").unwrap();
        assert_eq!(d.as_str(), "tp Alice Bob");
    }

    #[test]
    fn invite_moves_target_to_requester() {
        let d = between_players(TeleportKind::Invite, "Alice", "Bob").unwrap();
        assert_eq!(d.as_str(), "tp Bob Alice");
    }

    #[test]
    fn empty_identity_is_invalid() {
        assert!(matches!(
            between_players(TeleportKind::Ask, "", "Bob"),
            Err(MtpError::Validation(_))
        ));
    }

    #[test]
    fn dimension_changes_syntax() {
        let with_dim = TeleportPosition::new(
            "Alice",
            Position::new(point(), Some("minecraft:the_nether".into())),
        );
        assert_eq!(
            with_dim.directive().unwrap().as_str(),
            "execute in minecraft:the_nether run tp Alice 12 64 35.5"
        );

        let bare = TeleportPosition::new("Alice", Position::new(point(), None));
        assert_eq!(bare.directive().unwrap().as_str(), "tp Alice 12 64 35.5");
    }

    #[test]
    fn missing_position_or_target_is_invalid() {
        let mut builder = TeleportPosition::default();
        builder.set_target("Alice");
        assert!(matches!(builder.directive(), Err(MtpError::Validation(_))));

        let mut builder = TeleportPosition::default();
        builder.set_position(Position::new(point(), None));
        assert!(matches!(builder.directive(), Err(MtpError::Validation(_))));
    }

    #[test]
    fn target_enum() {
        assert_eq!(
            TeleportTarget::Player("Bot".into())
                .directive_for("Alice")
                .unwrap()
                .as_str(),
            "tp Alice Bot"
        );
    }
}
