use crate::events::ServerEvent;

/// Splits a vanilla/Paper log line into its message, e.g.
/// `[12:00:01] [Server thread/INFO]: <Alice> hi` yields `<Alice> hi`.
/// Forge-style `[...] [Server thread/INFO] [minecraft/DedicatedServer]: msg` works too.
fn log_message(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let (_, rest) = rest.split_once("] [")?;
    let (source, rest) = rest.split_once(']')?;
    if !source.contains('/') {
        return None;
    }
    let (_, message) = rest.split_once(": ")?;
    Some(message)
}

fn player_line<'a>(message: &'a str, suffix: &str) -> Option<&'a str> {
    let name = message.strip_suffix(suffix)?;
    (!name.is_empty() && !name.contains(' ')).then_some(name)
}

/// Classifies one console line. Lines that are not server log output are
/// treated as operator input typed into this process.
pub fn parse_line(line: &str) -> Option<ServerEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(message) = log_message(line) else {
        return Some(ServerEvent::ConsoleInput(line.trim().to_string()));
    };

    if let Some(chat) = message.strip_prefix('<') {
        let (player, content) = chat.split_once("> ")?;
        return Some(ServerEvent::PlayerChat {
            player: player.to_string(),
            content: content.to_string(),
        });
    }
    if let Some(player) = player_line(message, " joined the game") {
        return Some(ServerEvent::PlayerJoined(player.to_string()));
    }
    if let Some(player) = player_line(message, " left the game") {
        return Some(ServerEvent::PlayerLeft(player.to_string()));
    }
    if message.starts_with("Done (") {
        return Some(ServerEvent::ServerStarted);
    }
    if message.starts_with("Stopping server") {
        return Some(ServerEvent::ServerStopping);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_line() {
        assert_eq!(
            parse_line("[12:00:01] [Server thread/INFO]: <Alice> !!tpa Bob"),
            Some(ServerEvent::PlayerChat {
                player: "Alice".into(),
                content: "!!tpa Bob".into()
            })
        );
    }

    #[test]
    fn forge_style_chat_line() {
        assert_eq!(
            parse_line("[12:00:01] [Server thread/INFO] [minecraft/DedicatedServer]: <Bob> hi"),
            Some(ServerEvent::PlayerChat {
                player: "Bob".into(),
                content: "hi".into()
            })
        );
    }

    #[test]
    fn lifecycle_and_presence() {
        assert_eq!(
            parse_line("[12:00:00] [Server thread/INFO]: Done (3.201s)! For help, type \"help\""),
            Some(ServerEvent::ServerStarted)
        );
        assert_eq!(
            parse_line("[12:10:00] [Server thread/INFO]: Stopping server"),
            Some(ServerEvent::ServerStopping)
        );
        assert_eq!(
            parse_line("[12:00:05] [Server thread/INFO]: Steve joined the game"),
            Some(ServerEvent::PlayerJoined("Steve".into()))
        );
        assert_eq!(
            parse_line("[12:05:05] [Server thread/INFO]: Steve left the game\r\n"),
            Some(ServerEvent::PlayerLeft("Steve".into()))
        );
    }

    #[test]
    fn unrelated_log_output_is_ignored() {
        assert_eq!(
            parse_line("[12:00:00] [Worker-Main-1/INFO]: Preparing spawn area: 83%"),
            None
        );
        assert_eq!(
            parse_line("[12:00:00] [Server thread/INFO]: Villager Bob joined the game"),
            None
        );
    }

    #[test]
    fn operator_input() {
        assert_eq!(
            parse_line("!!mtp debug online\n"),
            Some(ServerEvent::ConsoleInput("!!mtp debug online".into()))
        );
        assert_eq!(parse_line("   "), None);
    }
}
