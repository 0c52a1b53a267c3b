use crate::commands::{Context, DebugCommand, OPERATOR_LEVEL};
use crate::error::MtpError;
use crate::modules::teleport::directive::{Point3D, Position, TeleportPosition, TeleportTarget};
use crate::storage::MtpModule;

const TEST_TARGET: &str = "Bot";

fn test_position() -> Position {
    Position::new(
        Point3D {
            x: 12.0,
            y: 64.0,
            z: 35.0,
        },
        Some("minecraft:overworld".into()),
    )
}

pub async fn run(ctx: &Context<'_>, command: &DebugCommand) -> Result<(), MtpError> {
    ctx.require_level(OPERATOR_LEVEL)?;

    match command {
        DebugCommand::Online => online(ctx).await,
        DebugCommand::Locate(player) => locate(ctx, player).await,
        DebugCommand::Teleport { to_pos, player } => {
            teleport(ctx, *to_pos, player.as_deref()).await
        }
        DebugCommand::Player(player) => player_files(ctx, player).await,
        DebugCommand::Select(player) => {
            ctx.reply(&format!("Choosing {}", player)).await;
            Ok(())
        }
        DebugCommand::Requests => requests(ctx).await,
    }
}

async fn online(ctx: &Context<'_>) -> Result<(), MtpError> {
    let reply = match ctx.data.info.online_players().await {
        Some(players) if players.is_empty() => "Online players: none".to_string(),
        Some(players) => format!("Online players: {}", players.join(", ")),
        None => "Online players: unknown".to_string(),
    };
    ctx.reply(&reply).await;
    Ok(())
}

async fn locate(ctx: &Context<'_>, player: &str) -> Result<(), MtpError> {
    match ctx.data.info.position(player).await {
        Some(position) => {
            ctx.reply(&format!("Position: {}", position.point)).await;
            let dimension = position.dimension.as_deref().unwrap_or("unknown");
            ctx.reply(&format!("Dimension: {}", dimension)).await;
        }
        None => ctx.reply("Failed to locate player.").await,
    }
    Ok(())
}

/// Shows the directive a direct teleport would run, without running it.
async fn teleport(ctx: &Context<'_>, to_pos: bool, player: Option<&str>) -> Result<(), MtpError> {
    let player = ctx.acting_player(player)?;
    let directive = if to_pos {
        TeleportPosition::default()
            .set_target(player)
            .set_position(test_position())
            .directive()?
    } else {
        TeleportTarget::Player(TEST_TARGET.into()).directive_for(&player)?
    };
    ctx.reply(&format!("> {}", directive)).await;
    Ok(())
}

async fn player_files(ctx: &Context<'_>, player: &str) -> Result<(), MtpError> {
    for module in MtpModule::ALL {
        let path = ctx.data.storage.player_file(module, player)?;
        let state = match ctx.data.storage.saved_positions(module, player).await? {
            Some(saved) => format!("{} saved", saved.positions.len()),
            None => "missing".to_string(),
        };
        ctx.reply(&format!("{}: {} ({})", module, path.display(), state))
            .await;
    }
    Ok(())
}

async fn requests(ctx: &Context<'_>) -> Result<(), MtpError> {
    let live = ctx.data.tracker.live().await;
    if live.is_empty() {
        ctx.reply("No pending teleport requests").await;
        return Ok(());
    }
    for request in live {
        ctx.reply(&request.to_string()).await;
    }
    Ok(())
}
