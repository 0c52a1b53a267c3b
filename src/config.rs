use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config_section;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct CommandNodes {
    pub prefix: String = "!!".to_string(),
    pub plugin: String = "mtp".to_string(),
    pub back: String = "back".to_string(),
    pub home: String = "home".to_string(),
    pub teleport: String = "tpr".to_string(),
    pub teleport_ask: String = "tpa".to_string(),
    pub teleport_invite: String = "tph".to_string(),
    pub warp: String = "warp".to_string(),
}
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct PluginModules {
    pub back: bool = false,
    pub home: bool = true,
    pub teleport: bool = true,
    pub teleport_ask: bool = true,
    pub teleport_invite: bool = true,
    pub warp: bool = true,
}
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct DataStorage {
    pub save_to_world: bool = false,
    pub server_dir: String,
    pub world_name: String = "world".to_string(),
}
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct InfoSources {
    /// Track joins and leaves from the console before asking RCON.
    pub log_presence: bool = true,
}
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct RconSection {
    pub address: String = "127.0.0.1:25575".to_string(),
    pub password: String,
}
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    pub rcon_wait: f64 = 0.5,
    pub rcon_failed: f64 = 5.0,
    pub teleport: f64 = 120.0,
}
}

fn seconds(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_else(|_| {
        warn!("Ignoring invalid timeout {}, using {:?}", value, fallback);
        fallback
    })
}

impl Timeouts {
    pub fn rcon_wait(&self) -> Duration {
        seconds(self.rcon_wait, Duration::from_millis(500))
    }

    pub fn rcon_failed(&self) -> Duration {
        seconds(self.rcon_failed, Duration::from_secs(5))
    }

    pub fn teleport(&self) -> Duration {
        seconds(self.teleport, Duration::from_secs(120))
    }
}

config_section! {
#[derive(Debug, Clone, PartialEq)]
pub struct MainConfig {
    pub enable: bool = true,
    pub enable_modules: PluginModules,
    pub command_nodes: CommandNodes,
    pub rcon: RconSection,
    pub timeout: Timeouts,
    pub sources: InfoSources,
    pub data_storage: DataStorage,
    /// Players allowed to act on behalf of others and to reset the config.
    pub operators: Vec<String>,
}
}

impl MainConfig {
    pub fn is_operator(&self, player: &str) -> bool {
        self.operators
            .iter()
            .any(|op| crate::utils::same_identity(op, player))
    }
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// A fresh config, with `save_to_world` switched on when the world folder exists.
pub async fn generate(server_dir: Option<&Path>) -> MainConfig {
    let mut config = MainConfig::default();

    if let Some(server_dir) = server_dir {
        config.data_storage.server_dir = server_dir.display().to_string();
        let world = server_dir.join(&config.data_storage.world_name);
        if fs::try_exists(&world).await.unwrap_or(false) {
            info!("Detected world folder {}", world.display());
            config.data_storage.save_to_world = true;
        }
    }

    config
}

pub async fn save(data_dir: &Path, config: &MainConfig) -> Result<(), ConfigError> {
    let path = config_path(data_dir);
    let io = |source| ConfigError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(data_dir).await.map_err(io)?;
    let text = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, text).await.map_err(io)
}

/// Loads `config.json` from `data_dir`. A missing file is generated and saved;
/// a broken one is an error. If saving the generated config fails the
/// defaults are used for this run.
pub async fn load(data_dir: &Path, server_dir: Option<&Path>) -> Result<MainConfig, ConfigError> {
    let path = config_path(data_dir);

    match fs::read_to_string(&path).await {
        Ok(text) => {
            info!("Loading existing config {}", path.display());
            return serde_json::from_str(&text).map_err(|source| {
                error!("Failed to parse {}", path.display());
                ConfigError::Parse { path, source }
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => return Err(ConfigError::Io { path, source }),
    }

    info!("Generating config {}", path.display());
    let config = generate(server_dir).await;
    if let Err(e) = save(data_dir, &config).await {
        error!("Failed to save new config: {}", e);
        warn!("Falling back to default config");
        return Ok(MainConfig::default());
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_config_is_generated_and_saved() {
        let dir = tempfile::tempdir().unwrap();

        let config = load(dir.path(), None).await.unwrap();
        assert_eq!(config, MainConfig::default());
        assert!(config_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn world_folder_enables_save_to_world() {
        let data = tempfile::tempdir().unwrap();
        let server = tempfile::tempdir().unwrap();
        std::fs::create_dir(server.path().join("world")).unwrap();

        let config = load(data.path(), Some(server.path())).await.unwrap();
        assert!(config.data_storage.save_to_world);
        assert_eq!(
            config.data_storage.server_dir,
            server.path().display().to_string()
        );
    }

    #[tokio::test]
    async fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            config_path(dir.path()),
            r#"{"timeout": {"teleport": 30}, "enable_modules": {"teleport_invite": false}}"#,
        )
        .unwrap();

        let config = load(dir.path(), None).await.unwrap();
        assert_eq!(config.timeout.teleport(), Duration::from_secs(30));
        assert_eq!(config.timeout.rcon_wait(), Duration::from_millis(500));
        assert!(!config.enable_modules.teleport_invite);
        assert!(config.enable_modules.teleport_ask);
        assert_eq!(config.command_nodes.prefix, "!!");
    }

    #[tokio::test]
    async fn broken_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(config_path(dir.path()), "{ nope").unwrap();

        assert!(matches!(
            load(dir.path(), None).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn negative_timeout_falls_back() {
        let timeouts = Timeouts {
            teleport: -1.0,
            ..Timeouts::default()
        };
        assert_eq!(timeouts.teleport(), Duration::from_secs(120));
    }
}
