use serde::{de::DeserializeOwned, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{fs, sync::RwLock, time};
use tracing::{error, warn};

const SAVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("Save to {0} timed out")]
    Timeout(PathBuf),
    #[error("Rejected update: {0}")]
    Rejected(String),
}

#[derive(Debug)]
struct DatabaseInner<T> {
    data: T,
    path: PathBuf,
}

/// One bincode file holding one record, shared behind a lock.
///
/// Unreadable or corrupt files are logged and replaced by `T::default()` so a
/// damaged player file never blocks that player's commands.
#[derive(Clone, Debug)]
pub struct Database<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> {
    inner: Arc<RwLock<DatabaseInner<T>>>,
}

impl<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> Database<T> {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create data directory {}: {}", parent.display(), e);
                DbError::Io(e)
            })?;
        }

        let data = if fs::try_exists(&path).await? {
            match fs::read(&path).await {
                Ok(bytes) => bincode::deserialize(&bytes).unwrap_or_else(|e| {
                    warn!("Discarding unreadable data file {}: {}", path.display(), e);
                    T::default()
                }),
                Err(e) => {
                    error!("Failed to read data file {}: {}", path.display(), e);
                    T::default()
                }
            }
        } else {
            T::default()
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(DatabaseInner { data, path })),
        })
    }

    async fn save(path: &Path, data: &T) -> Result<(), DbError> {
        let bytes = bincode::serialize(data)?;

        match time::timeout(SAVE_TIMEOUT, fs::write(path, bytes)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                error!("Saving {} timed out", path.display());
                Err(DbError::Timeout(path.to_path_buf()))
            }
        }
    }

    pub async fn get_data(&self) -> T {
        self.inner.read().await.data.clone()
    }

    /// Applies `f` to a copy, persists it, then publishes it. Nothing changes
    /// in memory when `f` rejects the update or the write fails.
    pub async fn transaction<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut T) -> Result<R, String>,
    {
        let mut guard = self.inner.write().await;
        let mut data = guard.data.clone();
        let result = f(&mut data).map_err(DbError::Rejected)?;

        Self::save(&guard.path, &data).await?;
        guard.data = data;

        Ok(result)
    }
}
