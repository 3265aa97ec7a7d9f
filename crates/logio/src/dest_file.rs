//! Append-mode destination files under a rooted directory
//!
//! [`Root`] owns the destination directory and the directory-creation
//! mode; it maps destination keys to paths and opens [`DestFile`]s.
//! [`DestFile`] keeps its live path so logrotate can close, rename and
//! reopen in place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Destination directory handle: path generation plus mkdir-with-mode
#[derive(Debug, Clone)]
pub struct Root {
    dir: PathBuf,
    dir_mode: u32,
}

impl Root {
    /// Create a root over `dir`, creating missing subdirectories with
    /// `dir_mode` (ignored on non-unix targets)
    pub fn new(dir: impl Into<PathBuf>, dir_mode: u32) -> Self {
        Self {
            dir: dir.into(),
            dir_mode,
        }
    }

    /// The destination directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a destination key to its on-disk path
    pub fn resolve(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Create a directory (and parents) with the configured mode
    pub fn make_dir(&self, path: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }
        builder.create(path)
    }

    /// Open the append-mode file for a destination key, creating parent
    /// directories as needed
    pub fn open(&self, key: &str) -> io::Result<DestFile> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            self.make_dir(parent)?;
        }
        DestFile::open(path)
    }
}

/// An append-open file that knows its live path
///
/// `close` is idempotent; writes against a closed handle fail. Logrotate
/// renames the live file away and reopens an empty one at the same path.
pub struct DestFile {
    path: PathBuf,
    file: Option<File>,
}

impl DestFile {
    /// Open (or create) `path` in append mode
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// The live path of this destination
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the descriptor is currently open
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Release the file descriptor; safe to call twice
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Move the live file to `new_path` and reopen empty at the
    /// original path
    ///
    /// The descriptor is closed first if still open, so the rename never
    /// races a buffered write on this handle.
    pub fn logrotate(&mut self, new_path: &Path) -> io::Result<()> {
        self.close()?;
        fs::rename(&self.path, new_path)?;
        self.file = Some(open_append(&self.path)?);
        Ok(())
    }

    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotConnected,
                format!("destination file {} is closed", self.path.display()),
            )
        })
    }
}

impl Write for DestFile {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
#[path = "dest_file_test.rs"]
mod dest_file_test;
