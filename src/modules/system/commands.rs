use std::sync::atomic::Ordering;
use tokio::fs;
use tracing::{info, warn};

use crate::commands::{Context, OPERATOR_LEVEL};
use crate::config::{self, ConfigError};
use crate::error::MtpError;

/// `!!mtp`
pub async fn help(ctx: &Context<'_>) -> Result<(), MtpError> {
    let nodes = &ctx.data.config.command_nodes;
    let prefix = &nodes.prefix;
    let lines = [
        format!("{}{} <player>: ask to teleport to a player", prefix, nodes.teleport_ask),
        format!("{}{} <player>: invite a player to you", prefix, nodes.teleport_invite),
        format!(
            "{}{} accept|reject|cancel: answer your latest request",
            prefix, nodes.teleport
        ),
        format!("{}{} debug ...: operator tools", prefix, nodes.plugin),
        format!("{}{} config reset [--reload]: delete the main config", prefix, nodes.plugin),
    ];
    for line in lines {
        ctx.reply(&line).await;
    }
    Ok(())
}

/// `!!mtp config reset [main] [--reload]`. The first call only arms the reset.
pub async fn reset_config(ctx: &Context<'_>, reload: bool) -> Result<(), MtpError> {
    ctx.require_level(OPERATOR_LEVEL)?;

    if !ctx.data.reset_armed.swap(true, Ordering::SeqCst) {
        warn!("Main config reset requested by {}, waiting for confirmation", ctx.source);
        ctx.reply("reset.confirm.config.main").await;
        return Ok(());
    }
    ctx.data.reset_armed.store(false, Ordering::SeqCst);

    let path = config::config_path(&ctx.data.data_dir);
    match fs::remove_file(&path).await {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} was already gone", path.display())
        }
        Err(source) => return Err(ConfigError::Io { path, source }.into()),
    }
    ctx.reply("reset.file_removed").await;

    if reload {
        let fresh = config::generate(ctx.data.server_dir.as_deref()).await;
        config::save(&ctx.data.data_dir, &fresh).await?;
        info!("Regenerated {}, it applies from the next start", path.display());
        ctx.reply("reset.file_regenerated").await;
    }
    Ok(())
}
