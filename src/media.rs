//! Object storage for uploaded media and thumbnails.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key` and return a retrievable locator.
    async fn put(&self, key: &str, data: Bytes) -> AppResult<String>;

    async fn get(&self, key: &str) -> AppResult<Option<Bytes>>;

    /// Remove the object a locator points at. Missing objects are not an error.
    async fn delete(&self, locator: &str) -> AppResult<()>;
}

/// Files under a root directory, handed out as `<public_base_url>/<key>`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn locator_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// The key a locator was issued for, if this store issued it.
    pub fn key_for<'a>(&self, locator: &'a str) -> Option<&'a str> {
        locator
            .strip_prefix(self.public_base_url.as_str())?
            .strip_prefix('/')
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let candidate = Path::new(key);
        if key.is_empty()
            || candidate
                .components()
                .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(AppError::BadRequest(format!("Invalid object key '{key}'")));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> AppResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::debug!(key, bytes = data.len(), "stored object");
        Ok(self.locator_for(key))
    }

    async fn get(&self, key: &str) -> AppResult<Option<Bytes>> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, locator: &str) -> AppResult<()> {
        let Some(key) = self.key_for(locator) else {
            tracing::warn!(locator, "not a locator issued by this store, skipping delete");
            return Ok(());
        };
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// `<folder>/<owner>/<uuid>.<ext>`, keeping only a plain alphanumeric extension.
pub fn object_key(folder: &str, owner_id: &str, file_name: Option<&str>) -> String {
    let owner: String = owner_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{folder}/{owner}/{}{ext}", uuid::Uuid::now_v7())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path(), "/media/");

        let locator = store
            .put("videos/u1/a.mp4", Bytes::from_static(b"frames"))
            .await
            .unwrap();
        assert_eq!(locator, "/media/videos/u1/a.mp4");
        assert_eq!(
            store.get("videos/u1/a.mp4").await.unwrap(),
            Some(Bytes::from_static(b"frames"))
        );

        store.delete(&locator).await.unwrap();
        assert!(store.get("videos/u1/a.mp4").await.unwrap().is_none());
        // Deleting again is fine.
        store.delete(&locator).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path(), "/media");
        for key in ["../etc/passwd", "/abs", "a/../../b", ""] {
            assert!(matches!(
                store.put(key, Bytes::new()).await,
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn object_key_keeps_safe_extension_only() {
        let key = object_key("videos", "u1", Some("Tatil Videosu.MP4"));
        assert!(key.starts_with("videos/u1/"));
        assert!(key.ends_with(".mp4"));

        let key = object_key("thumbnails", "../u1", Some("x.p/ng"));
        assert!(key.starts_with("thumbnails/u1/"));
        assert!(!key.contains(".."));

        let key = object_key("videos", "u1", None);
        assert!(!key.rsplit('/').next().unwrap().contains('.'));
    }
}
