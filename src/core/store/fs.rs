//! Filesystem secret storage.
//!
//! Each secret lives in its own file under an owner-only directory. The
//! file name is derived from the identity (see [`encoding::file_name`]) and
//! the contents are the base64 transport encoding of the value.
//!
//! Used directly on Android and iOS, where the app sandbox is the security
//! boundary, and as the fallback when a platform's vault tool is missing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::Backend;
use crate::core::domain::Identity;
use crate::core::encoding;
use crate::error::{BackendError, Error, Result};

/// Directory mode for the storage root (Unix only).
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// File-per-secret storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct Filesystem {
    dir: PathBuf,
}

impl Filesystem {
    /// Storage rooted at `dir`.
    ///
    /// The directory is created on the first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `id`.
    pub fn path_for(&self, id: &Identity<'_>) -> PathBuf {
        self.dir.join(id.file_name())
    }

    /// Create the storage directory with owner-only access if missing.
    fn ensure_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }
        debug!(dir = %self.dir.display(), "creating secret storage directory");

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }
        builder
            .create(&self.dir)
            .map_err(|source| io_error("create directory for", &self.dir, source))?;
        Ok(())
    }
}

impl Backend for Filesystem {
    fn name(&self) -> &'static str {
        "file"
    }

    fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let path = self.path_for(id);
        trace!(service = id.service(), key = id.key(), path = %path.display(), "writing secret file");

        let encoded = Zeroizing::new(encoding::encode(value));

        // Write beside the target and rename so readers never see a
        // partial file. NamedTempFile is created with mode 0600 on Unix.
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|source| io_error("write", &path, source))?;
        tmp.write_all(encoded.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|source| io_error("write", &path, source))?;
        tmp.persist(&path)
            .map_err(|e| io_error("write", &path, e.error))?;
        Ok(())
    }

    fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        let path = self.path_for(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => Zeroizing::new(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::NotFound),
            Err(source) => return Err(io_error("read", &path, source).into()),
        };
        let value = encoding::decode(&contents).map_err(BackendError::from)?;
        trace!(service = id.service(), key = id.key(), len = value.len(), "read secret file");
        Ok(value)
    }

    fn remove(&self, id: &Identity<'_>) -> Result<()> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(source) => Err(io_error("delete", &path, source).into()),
        }
    }
}

fn io_error(action: &'static str, path: &Path, source: io::Error) -> BackendError {
    BackendError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}
