//! Key-value blob storage grouped in containers.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::StoreError;

/// Blob containers used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Extracted page texts, one blob per document
    ExtractedPages,
    /// Chunk maps, one blob per document
    ChunkedDicts,
    /// Padded vector lists, one blob per document
    VectorizedDicts,
    /// Global indexes, one blob per collection
    Indexes,
    /// Service settings
    Settings,
}

impl Container {
    pub fn name(&self) -> &'static str {
        match self {
            Container::ExtractedPages => "extracted-dicts",
            Container::ChunkedDicts => "chunked-dicts",
            Container::VectorizedDicts => "vectorized-dicts",
            Container::Indexes => "indexes",
            Container::Settings => "settings",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains(&['/', '\\'][..])
        || key.chars().any(char::is_control);
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Blob storage.
///
/// Calls either succeed or fail as a whole. `list` returns keys in lexical
/// order, which is the document order used by indexing passes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, container: Container, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, container: Container, key: &str, data: Vec<u8>) -> Result<(), StoreError>;

    async fn list(&self, container: Container) -> Result<Vec<String>, StoreError>;

    /// Remove a blob; returns whether it existed.
    async fn delete(&self, container: Container, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, container: Container, key: &str) -> Result<bool, StoreError> {
        match self.get(container, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Blob store on the local filesystem: `<root>/<container>/<key>.json`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, container: Container, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(container.name()).join(format!("{key}.json")))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, container: Container, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path(container, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                container,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, container: Container, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path(container, key)?;
        let dir = self.root.join(container.name());
        tokio::fs::create_dir_all(&dir).await?;

        // Write then rename so readers never see a partial blob.
        let tmp = dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(container = %container, key, bytes = data.len(), "Blob written");
        Ok(())
    }

    async fn list(&self, container: Container) -> Result<Vec<String>, StoreError> {
        let dir = self.root.join(container.name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, container: Container, key: &str) -> Result<bool, StoreError> {
        let path = self.path(container, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(container = %container, key, "Blob deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(Container, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, container: Container, key: &str) -> Result<Vec<u8>, StoreError> {
        validate_key(key)?;
        self.blobs
            .read()
            .await
            .get(&(container, key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                container,
                key: key.to_string(),
            })
    }

    async fn put(&self, container: Container, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        validate_key(key)?;
        self.blobs
            .write()
            .await
            .insert((container, key.to_string()), data);
        Ok(())
    }

    async fn list(&self, container: Container) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .await
            .keys()
            .filter(|(c, _)| *c == container)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, container: Container, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        Ok(self
            .blobs
            .write()
            .await
            .remove(&(container, key.to_string()))
            .is_some())
    }
}
