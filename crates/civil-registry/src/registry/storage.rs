use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::domain::BlobRef;
use super::repository::{BlobError, BlobStore};
use crate::config::StorageConfig;

/// Filesystem-backed blob storage served under a public media URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.media_root.clone(), config.media_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn single_segment(value: &str) -> Result<&str, BlobError> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(value),
        _ => Err(BlobError::InvalidName(value.to_string())),
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> Result<BlobRef, BlobError> {
        let folder = single_segment(folder)?;
        let name = single_segment(name)?;

        let directory = self.root.join(folder);
        fs::create_dir_all(&directory)?;
        let path = directory.join(name);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "stored blob");

        let key = format!("{folder}/{name}");
        Ok(BlobRef {
            url: format!("{}/{key}", self.base_url),
            key,
        })
    }
}
