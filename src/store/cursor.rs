// src/store/cursor.rs
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::CursorStore;
use crate::error::StorageError;

/// Cursor kept as the whole content of one small text file.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    path: PathBuf,
}

impl FileCursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CursorStore for FileCursorStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => {
                let id = s.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    async fn save(&self, item_id: &str) -> Result<(), StorageError> {
        write_atomic(&self.path, item_id.as_bytes()).await
    }
}

/// Write via `<path>.tmp`, fsync, then rename over the target.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = write_tmp(path, bytes).await?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io(path, e))
}

/// First half of [`write_atomic`]: the synced `<path>.tmp`, not yet renamed.
pub(crate) async fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf, StorageError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::io(dir, e))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut f = fs::File::create(&tmp)
        .await
        .map_err(|e| StorageError::io(&tmp, e))?;
    f.write_all(bytes)
        .await
        .map_err(|e| StorageError::io(&tmp, e))?;
    f.sync_all().await.map_err(|e| StorageError::io(&tmp, e))?;
    Ok(tmp)
}

/// In-process cursor, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    inner: Mutex<Option<String>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(id: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Some(id.into())),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.lock().expect("cursor mutex poisoned").clone()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.get())
    }

    async fn save(&self, item_id: &str) -> Result<(), StorageError> {
        *self.inner.lock().expect("cursor mutex poisoned") = Some(item_id.to_string());
        Ok(())
    }
}
