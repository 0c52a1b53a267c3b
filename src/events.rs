use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::modules::system::events::{CommandHandler, LifecycleHandler, PresenceHandler};
use crate::{Data, Error};

/// Something that happened on the Minecraft server console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    ServerStarted,
    ServerStopping,
    PlayerJoined(String),
    PlayerLeft(String),
    PlayerChat { player: String, content: String },
    /// A line typed by the operator rather than printed by the server.
    ConsoleInput(String),
}

#[async_trait]
pub trait EventHandler: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn handle(&self, data: &Data, event: &ServerEvent) -> Result<(), Error>;
    fn box_clone(&self) -> Box<dyn EventHandler>;
}

impl Clone for Box<dyn EventHandler> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[derive(Debug, Default)]
pub struct EventManager {
    handlers: Mutex<Vec<Box<dyn EventHandler>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub async fn init(&self) {
        self.add_handler(LifecycleHandler).await;
        self.add_handler(PresenceHandler).await;
        self.add_handler(CommandHandler).await;
    }

    pub async fn add_handler(&self, handler: impl EventHandler + 'static) {
        self.handlers.lock().await.push(Box::new(handler));
    }

    /// Runs every handler on `event` concurrently and returns once all are done,
    /// so events are still processed in console order.
    pub async fn handle_event(&self, data: &Arc<Data>, event: ServerEvent) {
        let handlers = self.handlers.lock().await.clone();
        let event = Arc::new(event);
        let mut futures = FuturesUnordered::new();

        for handler in handlers {
            let data = data.clone();
            let event = event.clone();

            futures.push(tokio::spawn(async move {
                if let Err(e) = handler.handle(&data, &event).await {
                    tracing::error!("Error in event handler {}: {}", handler.name(), e);
                }
            }));
        }

        while let Some(joined) = futures.next().await {
            if let Err(e) = joined {
                tracing::error!("Event handler task failed: {}", e);
            }
        }
    }
}
