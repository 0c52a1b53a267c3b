use host::{
    bridge::{RconHost, RconInfo},
    console,
    rcon::{RconClient, RconSettings},
    Host, PlayerInfo, ServerStatus,
};
use modules::{
    info::{presence::LogPresence, GetInfo},
    teleport::{
        task::ExpireTask,
        tracker::{RequestTracker, TrackerSettings},
    },
};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use storage::DataManager;
use tasks::TaskManager;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod database;
mod error;
mod events;
mod host;
mod modules;
mod storage;
mod tasks;
mod utils;

use crate::config::MainConfig;
use crate::events::EventManager;

const DEFAULT_DATA_DIR: &str = "config/modern_teleport";

#[derive(Clone, Debug)]
pub struct Data {
    pub config: Arc<MainConfig>,
    pub data_dir: PathBuf,
    pub server_dir: Option<PathBuf>,
    pub host: Arc<dyn Host>,
    pub status: ServerStatus,
    pub presence: Arc<LogPresence>,
    pub info: Arc<GetInfo>,
    pub tracker: Arc<RequestTracker>,
    pub storage: Arc<DataManager>,
    /// Set by the first `config reset`, consumed by the second.
    pub reset_armed: Arc<AtomicBool>,
    pub task_manager: Arc<TaskManager>,
    pub event_manager: Arc<EventManager>,
}

impl Data {
    pub fn new(
        config: MainConfig,
        data_dir: PathBuf,
        server_dir: Option<PathBuf>,
        host: Arc<dyn Host>,
        status: ServerStatus,
        presence: Arc<LogPresence>,
        sources: Vec<Arc<dyn PlayerInfo>>,
    ) -> Self {
        let tracker = RequestTracker::new(host.clone(), TrackerSettings::from_config(&config));
        let storage = Arc::new(DataManager::new(&data_dir, &config.data_storage));

        Self {
            config: Arc::new(config),
            data_dir,
            server_dir,
            host,
            status,
            presence,
            info: Arc::new(GetInfo::new(sources)),
            tracker,
            storage,
            reset_armed: Arc::new(AtomicBool::new(false)),
            task_manager: Arc::new(TaskManager::new()),
            event_manager: Arc::new(EventManager::new()),
        }
    }

    pub async fn init_tasks(self: &Arc<Self>) {
        self.task_manager.add_task(ExpireTask).await;
        self.task_manager.start_tasks(self.clone()).await;
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("starting modern-teleport");

    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let data_dir = env_path("MTP_DATA_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let mut server_dir = env_path("MTP_SERVER_DIR");

    let mut config = config::load(&data_dir, server_dir.as_deref()).await?;
    if !config.enable {
        warn!("Plugin disabled in {}, exiting", config::config_path(&data_dir).display());
        return Ok(());
    }
    if let Ok(password) = std::env::var("MTP_RCON_PASSWORD") {
        config.rcon.password = password;
    }
    if config.rcon.password.is_empty() {
        warn!("RCON password is empty, the server will likely refuse the login");
    }
    if server_dir.is_none() && !config.data_storage.server_dir.is_empty() {
        server_dir = Some(PathBuf::from(&config.data_storage.server_dir));
    }

    let rcon = Arc::new(RconClient::new(RconSettings {
        address: config.rcon.address.clone(),
        password: config.rcon.password.clone(),
        wait: config.timeout.rcon_wait(),
        failed: config.timeout.rcon_failed(),
    }));
    let status = ServerStatus::new(true);
    let host: Arc<dyn Host> = Arc::new(RconHost::new(rcon.clone(), status.clone()));

    let presence = Arc::new(LogPresence::default());
    let mut sources: Vec<Arc<dyn PlayerInfo>> = Vec::new();
    if config.sources.log_presence {
        sources.push(presence.clone());
    }
    sources.push(Arc::new(RconInfo::new(rcon.clone(), status.clone())));

    let data = Arc::new(Data::new(
        config, data_dir, server_dir, host, status, presence, sources,
    ));
    data.event_manager.init().await;
    data.init_tasks().await;
    info!("Listening for console lines on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(event) = console::parse_line(&line) {
                        data.event_manager.handle_event(&data, event).await;
                    }
                }
                Ok(None) => {
                    info!("Console closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read console: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    data.tracker.cancel_all().await;
    data.task_manager.shutdown().await;
    rcon.disconnect().await;
    info!("modern-teleport stopped");
    Ok(())
}

#[cfg(test)]
pub fn test_data(host: Arc<host::mock::MockHost>, info: host::mock::MockInfo) -> Data {
    let presence = Arc::new(LogPresence::default());
    let sources: Vec<Arc<dyn PlayerInfo>> = vec![presence.clone(), Arc::new(info)];
    Data::new(
        MainConfig::default(),
        PathBuf::from(DEFAULT_DATA_DIR),
        None,
        host,
        ServerStatus::new(true),
        presence,
        sources,
    )
}
