pub mod commands;
pub mod directive;
pub mod task;
pub mod tracker;

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportKind {
    /// The requester wants to go to the target.
    Ask,
    /// The requester wants the target to come to them.
    Invite,
}

impl TeleportKind {
    pub fn notify_key(self) -> &'static str {
        match self {
            TeleportKind::Ask => "tpa.notify_request",
            TeleportKind::Invite => "tph.notify_request",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
    Cancel,
}

impl Decision {
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "accept" => Some(Decision::Accept),
            "reject" => Some(Decision::Reject),
            "cancel" => Some(Decision::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    TimedOut,
}

impl From<Decision> for Outcome {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => Outcome::Accepted,
            Decision::Reject => Outcome::Rejected,
            Decision::Cancel => Outcome::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeleportRequest {
    pub id: u64,
    pub requesting: String,
    pub target: String,
    pub kind: TeleportKind,
    pub created_at: DateTime<Utc>,
    pub outcome: Outcome,
}

impl TeleportRequest {
    /// The player who changes position once the request is accepted.
    pub fn moved(&self) -> &str {
        match self.kind {
            TeleportKind::Ask => &self.requesting,
            TeleportKind::Invite => &self.target,
        }
    }

    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        use crate::utils::same_identity;
        (same_identity(&self.requesting, a) && same_identity(&self.target, b))
            || (same_identity(&self.requesting, b) && same_identity(&self.target, a))
    }
}

impl fmt::Display for TeleportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.kind {
            TeleportKind::Ask => "->",
            TeleportKind::Invite => "<-",
        };
        write!(
            f,
            "#{} {} {} {} ({:?}, {})",
            self.id,
            self.requesting,
            arrow,
            self.target,
            self.outcome,
            self.created_at.format("%H:%M:%S")
        )
    }
}
