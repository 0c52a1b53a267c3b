use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::DataStorage;
use crate::database::{Database, DbError};
use crate::error::MtpError;
use crate::modules::teleport::directive::Position;
use crate::utils::valid_identity;

const WORLD_SUBDIR: &str = "modern_teleport";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtpModule {
    Back,
    Home,
    Warp,
}

impl MtpModule {
    pub const ALL: [MtpModule; 3] = [MtpModule::Back, MtpModule::Home, MtpModule::Warp];

    pub fn as_str(self) -> &'static str {
        match self {
            MtpModule::Back => "back",
            MtpModule::Home => "home",
            MtpModule::Warp => "warp",
        }
    }
}

impl fmt::Display for MtpModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named positions one player keeps in one module.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPositions {
    pub positions: BTreeMap<String, Position>,
}

/// Where per-player data lives: `<root>/<module>/<identity>.db`, with the root
/// inside the world folder when `save_to_world` is set so the data travels
/// with the world.
#[derive(Debug, Clone)]
pub struct DataManager {
    root: PathBuf,
}

impl DataManager {
    pub fn new(data_dir: &Path, storage: &DataStorage) -> Self {
        let root = if storage.save_to_world && !storage.server_dir.is_empty() {
            Path::new(&storage.server_dir)
                .join(&storage.world_name)
                .join(WORLD_SUBDIR)
        } else {
            data_dir.to_path_buf()
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_dir(&self, module: MtpModule) -> PathBuf {
        self.root.join(module.as_str())
    }

    pub fn player_file(&self, module: MtpModule, identity: &str) -> Result<PathBuf, MtpError> {
        if !valid_identity(identity) {
            return Err(MtpError::Validation(format!(
                "\"{}\" cannot be used as a file name",
                identity
            )));
        }
        Ok(self
            .module_dir(module)
            .join(format!("{}.db", identity.to_ascii_lowercase())))
    }

    pub async fn open<T>(&self, module: MtpModule, identity: &str) -> Result<Database<T>, MtpError>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static,
    {
        let path = self.player_file(module, identity)?;
        Ok(Database::open(path).await?)
    }

    pub async fn save_position(
        &self,
        module: MtpModule,
        identity: &str,
        name: &str,
        position: Position,
    ) -> Result<(), MtpError> {
        let db = self.open::<SavedPositions>(module, identity).await?;
        db.transaction(|saved| {
            saved.positions.insert(name.to_string(), position);
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// `None` when the player has no file for `module` yet; nothing is created.
    pub async fn saved_positions(
        &self,
        module: MtpModule,
        identity: &str,
    ) -> Result<Option<SavedPositions>, MtpError> {
        let path = self.player_file(module, identity)?;
        if !fs::try_exists(&path).await.map_err(DbError::Io)? {
            return Ok(None);
        }
        let db = self.open::<SavedPositions>(module, identity).await?;
        Ok(Some(db.get_data().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn data_folder_by_default() {
        let manager = DataManager::new(Path::new("config/mtp"), &DataStorage::default());
        assert_eq!(
            manager.player_file(MtpModule::Home, "Alice").unwrap(),
            PathBuf::from("config/mtp/home/alice.db")
        );
    }

    #[test]
    fn world_folder_when_enabled() {
        let storage = DataStorage {
            save_to_world: true,
            server_dir: "/srv/mc".into(),
            world_name: "survival".into(),
        };
        let manager = DataManager::new(Path::new("config/mtp"), &storage);
        assert_eq!(
            manager.module_dir(MtpModule::Warp),
            PathBuf::from("/srv/mc/survival/modern_teleport/warp")
        );
    }

    #[test]
    fn traversal_is_rejected() {
        let manager = DataManager::new(Path::new("data"), &DataStorage::default());
        assert!(matches!(
            manager.player_file(MtpModule::Back, "../../etc/passwd"),
            Err(MtpError::Validation(_))
        ));
    }

    use crate::modules::teleport::directive::Point3D;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Homes {
        names: Vec<String>,
    }

    #[tokio::test]
    async fn open_creates_module_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::new(dir.path(), &DataStorage::default());

        let db = manager.open::<Homes>(MtpModule::Home, "Bob").await.unwrap();
        db.transaction(|homes| {
            homes.names.push("base".into());
            Ok(())
        })
        .await
        .unwrap();

        assert!(dir.path().join("home").join("bob.db").exists());
    }

    #[tokio::test]
    async fn saved_positions_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DataManager::new(dir.path(), &DataStorage::default());
        assert_eq!(
            manager.saved_positions(MtpModule::Back, "Bob").await.unwrap(),
            None
        );
        assert!(!dir.path().join("back").exists());

        let origin = Position::new(
            Point3D {
                x: 10.0,
                y: 70.0,
                z: -4.5,
            },
            Some("minecraft:the_nether".into()),
        );
        manager
            .save_position(MtpModule::Back, "Bob", "last", origin.clone())
            .await
            .unwrap();

        let saved = manager
            .saved_positions(MtpModule::Back, "bob")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(saved.positions.get("last"), Some(&origin));
    }
}
