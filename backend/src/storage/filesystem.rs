use super::object_store::{public_url, validate_key, ObjectStore, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Objects kept as files under a root directory
pub struct FilesystemStore {
    root: PathBuf,
    public_url: String,
}

impl FilesystemStore {
    pub async fn new(root: impl AsRef<Path>, public_url: &str) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_url: public_url.to_string(),
        })
    }

    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        for component in Path::new(key).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StorageError::InvalidKey(format!(
                    "contains unsafe path component: {}",
                    key
                )));
            }
        }
        Ok(self.root.join(key))
    }

    fn not_found(key: &str, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<StoredObject> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Temp file in the same directory, then rename over the target
        let temp_name = format!(".tmp.{}", Uuid::new_v4());
        let temp_path = path.with_file_name(
            path.file_name()
                .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
                .unwrap_or_else(|| temp_name.clone()),
        );
        if let Err(e) = write_then_rename(&temp_path, &path, &data).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove temp file {:?}: {}", temp_path, cleanup);
                }
            }
            return Err(e.into());
        }

        log::debug!("Stored {} ({} bytes) under {:?}", key, data.len(), self.root);
        Ok(StoredObject {
            key: key.to_string(),
            url: public_url(&self.public_url, key),
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_path(key)?;
        fs::read(&path).await.map_err(|e| Self::not_found(key, e))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        fs::remove_file(&path).await.map_err(|e| Self::not_found(key, e))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    async fn health(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {}", e),
            ))
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {:?}",
                self.root
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn store() -> (tempfile::TempDir, FilesystemStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().join("media"), "http://localhost/media/")
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let (_dir, store) = store().await;
        let stored = store
            .put("events/1/poster-a.png", b"png".to_vec(), "image/png")
            .await
            .unwrap();
        assert_eq!(stored.url, "http://localhost/media/events/1/poster-a.png");
        assert_eq!(store.get("events/1/poster-a.png").await.unwrap(), b"png".to_vec());
        assert!(store.exists("events/1/poster-a.png").await.unwrap());

        store.delete("events/1/poster-a.png").await.unwrap();
        assert!(!store.exists("events/1/poster-a.png").await.unwrap());
        assert!(matches!(
            store.delete("events/1/poster-a.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_files() {
        let (_dir, store) = store().await;
        store.put("events/1/a.png", b"one".to_vec(), "image/png").await.unwrap();
        store.put("events/1/a.png", b"two".to_vec(), "image/png").await.unwrap();
        assert_eq!(store.get("events/1/a.png").await.unwrap(), b"two".to_vec());

        let mut entries = fs::read_dir(store.root.join("events/1")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn failed_put_leaves_no_temp_files() {
        let (_dir, store) = store().await;
        // A non-empty directory where the object should go makes the final step fail
        fs::create_dir_all(store.root.join("events/2/a.png/inner")).await.unwrap();

        let result = store.put("events/2/a.png", b"one".to_vec(), "image/png").await;
        assert!(matches!(result, Err(StorageError::Io(_))));

        let mut entries = fs::read_dir(store.root.join("events/2")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn traversal_rejected() {
        let (_dir, store) = store().await;
        assert!(store.exists("../escape").await.is_err());
        assert!(store.exists("/absolute/path").await.is_err());
        assert!(store.exists("foo/../../etc/passwd").await.is_err());
        assert!(store.exists("valid/nested/key").await.is_ok());
    }

    #[tokio::test]
    async fn health_fails_when_root_removed() {
        let (_dir, store) = store().await;
        assert!(store.health().await.is_ok());
        fs::remove_dir_all(&store.root).await.unwrap();
        assert!(store.health().await.is_err());
    }
}
