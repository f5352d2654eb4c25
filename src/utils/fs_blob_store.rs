//! Filesystem blob store

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::FileConfig;
use crate::traits::BlobStore;
use crate::types::*;

/// Stores uploaded files as `<millis>_<name>` under one directory
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    directory: PathBuf,
}

impl FileBlobStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_config(config: &FileConfig) -> Self {
        Self::new(&config.directory)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn resolve(&self, stored_ref: &str) -> RemittanceResult<PathBuf> {
        let name = Path::new(stored_ref);
        if name.components().count() != 1 || name.file_name().is_none() {
            return Err(RemittanceError::Storage(format!(
                "Invalid stored file reference: {}",
                stored_ref
            )));
        }
        Ok(self.directory.join(name))
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

fn storage_error(context: &str, error: std::io::Error) -> RemittanceError {
    RemittanceError::Storage(format!("{}: {}", context, error))
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> RemittanceResult<String> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| storage_error("create upload directory", e))?;

        let name = sanitize(suggested_name);
        let mut millis = chrono::Utc::now().timestamp_millis();
        loop {
            let stored_ref = format!("{}_{}", millis, name);
            let path = self.directory.join(&stored_ref);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match file {
                Ok(mut file) => {
                    tokio::io::AsyncWriteExt::write_all(&mut file, bytes)
                        .await
                        .map_err(|e| storage_error(&stored_ref, e))?;
                    tokio::io::AsyncWriteExt::flush(&mut file)
                        .await
                        .map_err(|e| storage_error(&stored_ref, e))?;
                    debug!("Stored {} bytes at {}", bytes.len(), path.display());
                    return Ok(stored_ref);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => millis += 1,
                Err(e) => return Err(storage_error(&stored_ref, e)),
            }
        }
    }

    async fn fetch(&self, stored_ref: &str) -> RemittanceResult<Vec<u8>> {
        let path = self.resolve(stored_ref)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error(stored_ref, e))
    }
}
