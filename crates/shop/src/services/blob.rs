//! Blob storage collaborator: store bytes, get a URL back.
//!
//! The core never touches upload mechanics beyond this seam. The
//! filesystem implementation performs the one-time upload-directory
//! creation at construction, keeping process-wide setup out of the
//! services.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

/// URL prefix under which stored blobs are served.
const URL_PREFIX: &str = "/uploads";

/// Capability to store and remove opaque blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the URL they will be served from.
    async fn store(&self, bytes: &[u8], content_type: &str) -> io::Result<String>;

    /// Remove a previously stored blob by its URL.
    async fn remove(&self, url: &str) -> io::Result<()>;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Open (and create if needed) the upload directory.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, bytes: &[u8], content_type: &str) -> io::Result<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("{URL_PREFIX}/{filename}"))
    }

    async fn remove(&self, url: &str) -> io::Result<()> {
        let filename = filename_from_url(url).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unexpected blob URL: {url}"))
        })?;
        tokio::fs::remove_file(self.dir.join(filename)).await
    }
}

/// Map a content type onto a file extension.
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Extract the bare filename from a blob URL, rejecting anything that
/// could escape the upload directory.
fn filename_from_url(url: &str) -> Option<&str> {
    let filename = url.strip_prefix(URL_PREFIX)?.strip_prefix('/')?;
    let is_safe = !filename.is_empty()
        && Path::new(filename).components().count() == 1
        && !filename.contains("..");
    is_safe.then_some(filename)
}
