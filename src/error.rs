use thiserror::Error;

use crate::{config::ConfigError, database::DbError, host::HostError};

/// Every failure a teleport or debug command can end with. The dispatcher turns
/// each one into a single reply via [`MtpError::message_key`].
#[derive(Error, Debug)]
pub enum MtpError {
    #[error("a teleport request between {requesting} and {target} is already pending")]
    Duplicate { requesting: String, target: String },
    #[error("no pending teleport request targets {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    Validation(String),
    #[error("\"{0}\" is not enabled in config")]
    FeatureDisabled(&'static str),
    #[error("teleport request timed out")]
    TimeoutExpired,
    #[error("permission denied")]
    PermissionDenied,
    #[error("player {0} is offline")]
    PlayerOffline(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl MtpError {
    pub fn message_key(&self) -> &'static str {
        match self {
            MtpError::Duplicate { .. } => "tpr.exists",
            MtpError::NotFound(_) => "tpr.not_found",
            MtpError::Validation(_) => "error.invalid_argument",
            MtpError::FeatureDisabled(_) => "error.feature_disabled",
            MtpError::TimeoutExpired => "tpr.timeout",
            MtpError::PermissionDenied => "permission_denied",
            MtpError::PlayerOffline(_) => "player_offline",
            MtpError::MissingArgument(_) => "missing_argument",
            MtpError::Host(_) => "error.host",
            MtpError::Storage(_) => "error.storage",
            MtpError::Config(_) => "error.config",
        }
    }
}
