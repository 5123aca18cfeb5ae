//! Delivery of completed files.
//!
//! The pipeline hands every completed, non-filler file to a [`FileSink`].
//! Failures are reported back to the caller for logging; nothing is retried
//! because the assembled bytes are not retained after delivery.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, sync::mpsc};

use crate::assembler::CompletedFile;

/// Destination for completed files.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Persist or forward `file`.
    async fn deliver(&self, file: &CompletedFile) -> io::Result<()>;
}

/// Writes each file to `<dir>/<filename>`, replacing earlier versions.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink rooted at `dir`. The directory is created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    /// Directory files are written into.
    #[must_use]
    pub fn dir(&self) -> &Path { &self.dir }

    /// Resolve the target path for `filename`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when the filename is not a
    /// single plain path component.
    pub fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.dir.join(name)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to write unsafe filename {filename:?}"),
            )),
        }
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn deliver(&self, file: &CompletedFile) -> io::Result<()> {
        let path = self.path_for(file.filename())?;
        fs::create_dir_all(&self.dir).await?;
        let mut out = fs::File::create(&path).await?;
        out.write_all(file.content()).await?;
        out.sync_all().await
    }
}

/// Forwards completed files to another task.
#[async_trait]
impl FileSink for mpsc::Sender<CompletedFile> {
    async fn deliver(&self, file: &CompletedFile) -> io::Result<()> {
        self.send(file.clone())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "file receiver dropped"))
    }
}
