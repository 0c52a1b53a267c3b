//! Parsing and dispatch of `!!tpa`, `!!tph`, `!!tpr` and `!!mtp` commands.

use tracing::{debug, error, info, trace, warn};

use crate::config::{CommandNodes, MainConfig};
use crate::error::MtpError;
use crate::host::messages;
use crate::modules::teleport::{Decision, TeleportKind};
use crate::modules::{system, teleport};
use crate::utils::{same_identity, valid_identity};
use crate::Data;

pub const OPERATOR_LEVEL: u8 = 4;
pub const USER_LEVEL: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    Console,
    Player(String),
}

impl CommandSource {
    pub fn permission_level(&self, config: &MainConfig) -> u8 {
        match self {
            CommandSource::Console => OPERATOR_LEVEL,
            CommandSource::Player(name) if config.is_operator(name) => OPERATOR_LEVEL,
            CommandSource::Player(_) => USER_LEVEL,
        }
    }
}

impl std::fmt::Display for CommandSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandSource::Console => f.write_str("console"),
            CommandSource::Player(name) => f.write_str(name),
        }
    }
}

/// Who ran a command and everything the handler may touch.
#[derive(Debug)]
pub struct Context<'a> {
    pub data: &'a Data,
    pub source: CommandSource,
}

impl<'a> Context<'a> {
    pub fn new(data: &'a Data, source: CommandSource) -> Self {
        Self { data, source }
    }

    pub async fn reply(&self, message: &str) {
        match &self.source {
            CommandSource::Console => info!("{}", messages::render(message)),
            CommandSource::Player(player) => {
                if let Err(e) = self.data.host.tell(player, message).await {
                    warn!("Failed to reply to {}: {}", player, e);
                }
            }
        }
    }

    pub fn require_level(&self, level: u8) -> Result<(), MtpError> {
        if self.source.permission_level(&self.data.config) < level {
            return Err(MtpError::PermissionDenied);
        }
        Ok(())
    }

    /// Fails only when a source positively reports the player offline.
    pub async fn ensure_not_offline(&self, player: &str) -> Result<(), MtpError> {
        match self.data.info.is_online(player).await {
            Some(false) => Err(MtpError::PlayerOffline(player.to_string())),
            Some(true) => Ok(()),
            None => {
                warn!("Online state of {} is unknown, continuing", player);
                Ok(())
            }
        }
    }

    /// Console must name a player; a player always acts as themselves.
    pub fn acting_player(&self, explicit: Option<&str>) -> Result<String, MtpError> {
        match (&self.source, explicit) {
            (CommandSource::Console, Some(player)) => Ok(player.to_string()),
            (CommandSource::Console, None) => Err(MtpError::MissingArgument("player")),
            (CommandSource::Player(name), explicit) => {
                if let Some(ignored) = explicit.filter(|p| !same_identity(p, name)) {
                    debug!("{} named {}, acting as themselves", name, ignored);
                }
                Ok(name.clone())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    Online,
    Locate(String),
    Teleport { to_pos: bool, player: Option<String> },
    Player(String),
    Select(String),
    Requests,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Request {
        kind: TeleportKind,
        player: String,
        target: Option<String>,
    },
    Respond {
        decision: Decision,
        target: Option<String>,
    },
    Help,
    Debug(DebugCommand),
    ResetConfig {
        reload: bool,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Request {
                kind: TeleportKind::Ask,
                ..
            } => "tpa",
            Command::Request {
                kind: TeleportKind::Invite,
                ..
            } => "tph",
            Command::Respond { .. } => "tpr",
            Command::Help => "help",
            Command::Debug(_) => "debug",
            Command::ResetConfig { .. } => "config reset",
        }
    }
}

fn identity(arg: Option<&str>, name: &'static str) -> Result<String, MtpError> {
    let arg = arg.ok_or(MtpError::MissingArgument(name))?;
    if !valid_identity(arg) {
        return Err(MtpError::Validation(format!("invalid {}: {}", name, arg)));
    }
    Ok(arg.to_string())
}

fn optional_identity(arg: Option<&str>, name: &'static str) -> Result<Option<String>, MtpError> {
    arg.map(|a| identity(Some(a), name)).transpose()
}

fn no_more<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<(), MtpError> {
    match args.next() {
        Some(extra) => Err(MtpError::Validation(format!("unexpected argument: {}", extra))),
        None => Ok(()),
    }
}

fn parse_bool(arg: Option<&str>, name: &'static str) -> Result<bool, MtpError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(MtpError::Validation(format!("{} must be true or false, got {}", name, other))),
        None => Err(MtpError::MissingArgument(name)),
    }
}

fn parse_debug<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<DebugCommand, MtpError> {
    let command = match args.next() {
        Some("online") => DebugCommand::Online,
        Some("requests") => DebugCommand::Requests,
        Some("locate") => DebugCommand::Locate(identity(args.next(), "player")?),
        Some("player") => DebugCommand::Player(identity(args.next(), "player")?),
        Some("select") => DebugCommand::Select(identity(args.next(), "player")?),
        Some("teleport") => DebugCommand::Teleport {
            to_pos: parse_bool(args.next(), "to_pos")?,
            player: optional_identity(args.next(), "player")?,
        },
        Some(other) => return Err(MtpError::Validation(format!("unknown debug command: {}", other))),
        None => return Err(MtpError::MissingArgument("debug command")),
    };
    no_more(args)?;
    Ok(command)
}

/// `config reset [main] [--reload]` and `delete config[.main] [--reload]`
fn parse_reset<'a>(args: impl Iterator<Item = &'a str>) -> Result<Command, MtpError> {
    let mut reload = false;
    let mut seen_main = false;
    for arg in args {
        match arg {
            "--reload" if !reload => reload = true,
            "main" if !seen_main && !reload => seen_main = true,
            other => return Err(MtpError::Validation(format!("unexpected argument: {}", other))),
        }
    }
    Ok(Command::ResetConfig { reload })
}

fn parse_plugin<'a>(mut args: impl Iterator<Item = &'a str>) -> Result<Command, MtpError> {
    match args.next() {
        None => Ok(Command::Help),
        Some("help") => {
            no_more(args)?;
            Ok(Command::Help)
        }
        Some("debug") => Ok(Command::Debug(parse_debug(args)?)),
        Some("config") => match args.next() {
            Some("reset") => parse_reset(args),
            _ => Err(MtpError::Validation("expected `config reset`".into())),
        },
        Some("delete") => match args.next() {
            Some("config") | Some("config.main") => parse_reset(args),
            _ => Err(MtpError::Validation("expected `delete config`".into())),
        },
        Some(other) => Err(MtpError::Validation(format!("unknown command: {}", other))),
    }
}

/// `Ok(None)` when the line is not one of our commands at all.
pub fn parse(nodes: &CommandNodes, line: &str) -> Result<Option<Command>, MtpError> {
    let mut args = line.split_whitespace();
    let Some(root) = args.next().and_then(|first| first.strip_prefix(nodes.prefix.as_str())) else {
        return Ok(None);
    };

    let command = if root == nodes.teleport_ask || root == nodes.teleport_invite {
        let kind = if root == nodes.teleport_ask {
            TeleportKind::Ask
        } else {
            TeleportKind::Invite
        };
        let player = identity(args.next(), "player")?;
        let target = optional_identity(args.next(), "target")?;
        no_more(args)?;
        Command::Request {
            kind,
            player,
            target,
        }
    } else if root == nodes.teleport {
        let decision = match args.next() {
            Some(word) => Decision::parse(word).ok_or_else(|| {
                MtpError::Validation(format!("expected accept, reject or cancel, got {}", word))
            })?,
            None => return Err(MtpError::MissingArgument("accept|reject|cancel")),
        };
        let target = optional_identity(args.next(), "target")?;
        no_more(args)?;
        Command::Respond { decision, target }
    } else if root == nodes.plugin {
        parse_plugin(args)?
    } else {
        return Ok(None);
    };

    Ok(Some(command))
}

/// Parses and runs one line from `source`. Returns whether the line was one of
/// our commands. Every failure ends in exactly one reply to `source`.
pub async fn dispatch(data: &Data, source: CommandSource, line: &str) -> bool {
    if !data.config.enable {
        return false;
    }

    let ctx = Context::new(data, source);
    let command = match parse(&data.config.command_nodes, line) {
        Ok(Some(command)) => command,
        Ok(None) => return false,
        Err(e) => {
            info!("Rejected `{}` from {}: {}", line, ctx.source, e);
            ctx.reply(e.message_key()).await;
            return true;
        }
    };

    trace!("Command {} used by {}", command.name(), ctx.source);
    let result = match &command {
        Command::Request {
            kind,
            player,
            target,
        } => teleport::commands::request(&ctx, *kind, player, target.as_deref()).await,
        Command::Respond { decision, target } => {
            teleport::commands::respond(&ctx, *decision, target.as_deref()).await
        }
        Command::Help => system::commands::help(&ctx).await,
        Command::Debug(debug) => crate::modules::debug::commands::run(&ctx, debug).await,
        Command::ResetConfig { reload } => system::commands::reset_config(&ctx, *reload).await,
    };

    match result {
        Ok(()) => info!("Command {} completed for {}", command.name(), ctx.source),
        Err(e) => {
            match &e {
                MtpError::Host(_) | MtpError::Storage(_) | MtpError::Config(_) => {
                    error!("Command {} failed for {}: {}", command.name(), ctx.source, e)
                }
                _ => info!("Command {} refused for {}: {}", command.name(), ctx.source, e),
            }
            ctx.reply(e.message_key()).await;
        }
    }
    true
}
