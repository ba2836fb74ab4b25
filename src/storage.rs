use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

/// Where uploaded return images end up.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Stable URL the stored object is served from.
    fn public_url(&self, key: &str) -> String;
}

/// Files on local disk, served by the `/uploads` static route.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Creates `root` if missing. `base_url` is the public origin, e.g. `http://host:8080`.
    pub async fn new(root: impl Into<PathBuf>, base_url: &str) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create upload dir {}", root.display()))?;
        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        anyhow::ensure!(safe && !key.is_empty(), "invalid object key {:?}", key);
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let written = write_file(&path, &body).await;
        if let Err(e) = written {
            // never leave a partial upload behind
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.context(format!("write object {}", key)));
        }

        tracing::debug!(key, content_type, bytes = body.len(), "object stored");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete object {}", key)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.base_url, key)
    }
}

async fn write_file(path: &Path, body: &[u8]) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:8080/")
            .await
            .unwrap();

        storage
            .put_object("returns/a.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let on_disk = tokio::fs::read(dir.path().join("returns/a.png")).await.unwrap();
        assert_eq!(on_disk, b"png");

        storage.delete_object("returns/a.png").await.unwrap();
        assert!(!dir.path().join("returns/a.png").exists());
        // deleting twice is fine
        storage.delete_object("returns/a.png").await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_leaves_no_object_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://h").await.unwrap();
        // the key's path is already taken by a directory, so the write fails
        std::fs::create_dir_all(dir.path().join("returns/taken.png/inner")).unwrap();

        let err = storage
            .put_object("returns/taken.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("write object returns/taken.png"));
        assert!(dir.path().join("returns/taken.png").is_dir());

        // a fresh key next to it still works and nothing partial remains
        storage
            .put_object("returns/ok.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        let mut names: Vec<_> = std::fs::read_dir(dir.path().join("returns"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["ok.png", "taken.png"]);
    }

    #[tokio::test]
    async fn public_url_uses_uploads_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://example.test/").await.unwrap();
        assert_eq!(
            storage.public_url("returns/x.jpg"),
            "http://example.test/uploads/returns/x.jpg"
        );
    }

    #[tokio::test]
    async fn rejects_keys_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://h").await.unwrap();
        let err = storage
            .put_object("../evil.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid object key"));
    }
}
