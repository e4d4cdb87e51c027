use crate::db::{LocalStore, StoreError};
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot write media file: {0}")]
    Io(#[from] io::Error),
}

/// Directory that stored media blobs are written into so they can be displayed.
#[derive(Debug)]
pub struct MediaCache {
    dir: PathBuf,
    next_id: u64,
}

impl MediaCache {
    pub fn new(dir: impl Into<PathBuf>) -> MediaCache {
        MediaCache {
            dir: dir.into(),
            next_id: 0,
        }
    }

    pub fn in_temp_dir() -> MediaCache {
        Self::new(std::env::temp_dir().join(format!("mondaishuu-{}", std::process::id())))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn materialize(&mut self, key: &str, bytes: &[u8]) -> io::Result<BlobResource> {
        fs::create_dir_all(&self.dir)?;
        let name = Path::new(key)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("media");
        let path = self.dir.join(format!("{:04}-{}", self.next_id, name));
        self.next_id += 1;
        fs::write(&path, bytes)?;
        debug!("[Media] Wrote '{}' to {:?}", key, path);
        Ok(BlobResource {
            key: key.to_string(),
            path,
        })
    }
}

// Only an empty directory is removed, so a cache pointed at a shared directory leaves it alone.
impl Drop for MediaCache {
    fn drop(&mut self) {
        match fs::remove_dir(&self.dir) {
            Ok(_) => debug!("[Media] Removed {:?}", self.dir),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("[Media] Cannot remove {:?}: {}", self.dir, err),
        }
    }
}

/// A media blob written out to the cache. The file is removed when this is dropped.
#[derive(Debug)]
pub struct BlobResource {
    key: String,
    path: PathBuf,
}

impl BlobResource {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BlobResource {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(_) => debug!("[Media] Released {:?}", self.path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("[Media] Cannot release {:?}: {}", self.path, err),
        }
    }
}

#[derive(Debug)]
pub enum DisplayResource {
    Blob(BlobResource),
    /// The media reference itself, e.g. a path or URL.
    Literal(String),
}

impl DisplayResource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DisplayResource::Blob(blob) => Some(blob.path()),
            DisplayResource::Literal(_) => None,
        }
    }
}

impl fmt::Display for DisplayResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayResource::Blob(blob) => write!(f, "{}", blob.path.display()),
            DisplayResource::Literal(reference) => f.write_str(reference),
        }
    }
}

/// Looks `reference` up in the media namespace, falling back to the reference itself.
pub fn resolve(
    store: &mut LocalStore,
    reference: &str,
    cache: &mut MediaCache,
) -> Result<DisplayResource, MediaError> {
    match store.media(reference)? {
        Some(bytes) => Ok(DisplayResource::Blob(cache.materialize(reference, &bytes)?)),
        None => {
            debug!("[Media] '{}' is not stored, using it as is", reference);
            Ok(DisplayResource::Literal(reference.to_string()))
        }
    }
}

/// Holds the resource currently on screen.
#[derive(Debug, Default)]
pub struct MediaSlot {
    current: Option<DisplayResource>,
}

impl MediaSlot {
    pub fn current(&self) -> Option<&DisplayResource> {
        self.current.as_ref()
    }

    pub fn release(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!("[Media] Releasing {}", previous);
        }
    }

    /// Releases the previous resource, then holds `next`.
    pub fn replace(&mut self, next: DisplayResource) -> &DisplayResource {
        self.release();
        self.current.insert(next)
    }
}
