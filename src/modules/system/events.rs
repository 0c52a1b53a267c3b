use crate::commands::{dispatch, CommandSource};
use crate::events::{EventHandler, ServerEvent};
use crate::{Data, Error};
use async_trait::async_trait;
use tracing::{debug, info};

/// Tracks whether the server is up and cancels pending requests when it stops.
#[derive(Debug, Clone)]
pub struct LifecycleHandler;

#[async_trait]
impl EventHandler for LifecycleHandler {
    fn name(&self) -> &str {
        "Lifecycle"
    }

    async fn handle(&self, data: &Data, event: &ServerEvent) -> Result<(), Error> {
        match event {
            ServerEvent::ServerStarted => {
                info!("Server started");
                data.status.set_running(true);
                data.presence.server_started();
            }
            ServerEvent::ServerStopping => {
                info!("Server stopping");
                // Players are still connected here, so they hear about the cancel.
                data.tracker.cancel_all().await;
                data.status.set_running(false);
                data.presence.server_stopped();
            }
            _ => {}
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone)]
pub struct PresenceHandler;

#[async_trait]
impl EventHandler for PresenceHandler {
    fn name(&self) -> &str {
        "Presence"
    }

    async fn handle(&self, data: &Data, event: &ServerEvent) -> Result<(), Error> {
        match event {
            ServerEvent::PlayerJoined(player) => data.presence.joined(player),
            ServerEvent::PlayerLeft(player) => data.presence.left(player),
            _ => {}
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

/// Feeds chat lines and operator input to the command dispatcher.
#[derive(Debug, Clone)]
pub struct CommandHandler;

#[async_trait]
impl EventHandler for CommandHandler {
    fn name(&self) -> &str {
        "Command"
    }

    async fn handle(&self, data: &Data, event: &ServerEvent) -> Result<(), Error> {
        let handled = match event {
            ServerEvent::PlayerChat { player, content } => {
                dispatch(data, CommandSource::Player(player.clone()), content).await
            }
            ServerEvent::ConsoleInput(line) => dispatch(data, CommandSource::Console, line).await,
            _ => return Ok(()),
        };
        if !handled {
            debug!("Ignoring {:?}", event);
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockInfo};
    use crate::host::PlayerInfo;
    use crate::modules::teleport::TeleportKind;
    use crate::test_data;
    use std::sync::Arc;

    #[tokio::test]
    async fn stopping_cancels_requests_and_resets_presence() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), MockInfo::default());

        LifecycleHandler
            .handle(&data, &ServerEvent::ServerStarted)
            .await
            .unwrap();
        PresenceHandler
            .handle(&data, &ServerEvent::PlayerJoined("Alice".into()))
            .await
            .unwrap();
        assert_eq!(
            data.presence.online_players().await,
            Some(vec!["Alice".to_string()])
        );

        data.tracker
            .submit("Alice", "Bob", TeleportKind::Ask)
            .await
            .unwrap();
        LifecycleHandler
            .handle(&data, &ServerEvent::ServerStopping)
            .await
            .unwrap();

        assert_eq!(data.tracker.len().await, 0);
        assert_eq!(host.told_to("Alice"), vec!["tpr.cancelled"]);
        assert!(!data.status.is_running());
        assert_eq!(data.presence.online_players().await, None);
    }

    #[tokio::test]
    async fn chat_commands_are_dispatched() {
        let host = Arc::new(MockHost::default());
        let data = test_data(host.clone(), MockInfo::default());

        CommandHandler
            .handle(
                &data,
                &ServerEvent::PlayerChat {
                    player: "Alice".into(),
                    content: "!!tpa Bob".into(),
                },
            )
            .await
            .unwrap();
        CommandHandler
            .handle(
                &data,
                &ServerEvent::PlayerChat {
                    player: "Bob".into(),
                    content: "hello".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(data.tracker.len().await, 1);
        assert_eq!(host.told_to("Alice"), vec!["tpa.create_request"]);
        assert!(host.told_to("Bob").iter().all(|m| m == "tpa.notify_request"));
    }
}
