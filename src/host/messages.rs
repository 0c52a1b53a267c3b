use std::collections::HashMap;
use std::sync::OnceLock;

const EN_US: &[(&str, &str)] = &[
    ("tpa.notify_request", "Someone wants to teleport to you. Use !!tpr accept or !!tpr reject."),
    ("tph.notify_request", "Someone invites you to teleport to them. Use !!tpr accept or !!tpr reject."),
    ("tpa.create_request", "Teleport request sent."),
    ("tph.create_request", "Teleport invitation sent."),
    ("tpr.accept", "You accepted the teleport request."),
    ("tpr.accepted", "Your teleport request was accepted."),
    ("tpr.reject", "You rejected the teleport request."),
    ("tpr.rejected", "Your teleport request was rejected."),
    ("tpr.cancel", "The teleport request was cancelled."),
    ("tpr.cancelled", "Your teleport request was cancelled."),
    ("tpr.timeout", "The teleport request timed out."),
    ("tpr.exists", "A teleport request between you two is already pending."),
    ("tpr.not_found", "There is no pending teleport request for you."),
    ("player_offline", "That player is offline."),
    ("permission_denied", "You do not have permission to do that."),
    ("missing_argument", "A required argument is missing."),
    ("error.invalid_argument", "Invalid argument."),
    ("error.feature_disabled", "This feature is disabled in the config."),
    ("error.host", "The server did not respond, try again later."),
    ("error.storage", "Failed to access player data."),
    ("error.config", "Failed to update the config file."),
    ("reset.confirm.config.main", "Run the command again to delete the main config."),
    ("reset.file_removed", "Main config removed."),
    ("reset.file_regenerated", "Main config regenerated with defaults."),
];

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| EN_US.iter().copied().collect())
}

/// Resolves a translation key, falling back to the key itself so literal text
/// passes through untouched.
pub fn render(key: &str) -> &str {
    table().get(key).copied().unwrap_or(key)
}
