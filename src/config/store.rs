use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::AppConfig;
use crate::error::{AppError, Result};

/// Configuration store backed by a JSON file
///
/// Uses `ArcSwap` for lock-free reads, so hot paths can call [`get`](Self::get)
/// freely. Updates are written to disk before they become visible.
#[derive(Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    cache: Arc<ArcSwap<AppConfig>>,
    change_tx: broadcast::Sender<ConfigChange>,
}

/// Configuration change event
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub key: String,
}

impl ConfigStore {
    /// Open the store at `path`, writing defaults when the file does not exist
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let config = match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, writing defaults", path.display());
                let config = AppConfig::default();
                Self::write_file(path, &config).await?;
                config
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::with_path(Some(path.to_path_buf()), config))
    }

    /// In-memory store, nothing is persisted
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_path(None, config)
    }

    fn with_path(path: Option<PathBuf>, config: AppConfig) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            path,
            cache: Arc::new(ArcSwap::from_pointee(config)),
            change_tx,
        }
    }

    async fn write_file(path: &Path, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        // Write then rename so a crash never leaves a truncated file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Get current configuration (lock-free)
    pub fn get(&self) -> Arc<AppConfig> {
        self.cache.load_full()
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the entire configuration
    pub async fn set(&self, config: AppConfig) -> Result<()> {
        if let Some(path) = &self.path {
            Self::write_file(path, &config).await?;
        }
        self.cache.store(Arc::new(config));

        let _ = self.change_tx.send(ConfigChange {
            key: "app_config".to_string(),
        });

        Ok(())
    }

    /// Read-modify-write update; concurrent updates are last-writer-wins
    pub async fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = (**self.cache.load()).clone();
        f(&mut config);
        self.set(config).await
    }

    /// Subscribe to configuration changes
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.change_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RenderMode;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_config_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("relay.json");

        let store = ConfigStore::open(&path).await.unwrap();
        assert_eq!(store.get().web.http_port, 5005);
        assert!(path.exists());

        let mut rx = store.subscribe();
        store
            .update(|c| {
                c.web.http_port = 9000;
                c.pipeline.default_mode = RenderMode::Isolated;
            })
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().key, "app_config");
        assert_eq!(store.get().web.http_port, 9000);

        // Reopen and verify persistence
        drop(store);
        let store = ConfigStore::open(&path).await.unwrap();
        assert_eq!(store.get().web.http_port, 9000);
        assert_eq!(store.get().pipeline.default_mode, RenderMode::Isolated);
    }

    #[tokio::test]
    async fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = ConfigStore::open(&path).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = ConfigStore::in_memory(AppConfig::default());
        store.update(|c| c.pipeline.max_sessions = 1).await.unwrap();
        assert_eq!(store.get().pipeline.max_sessions, 1);
        assert!(store.path().is_none());
    }
}
