//! Scratch directories for sink tests.

use std::{
    fs,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
};

use rstest::fixture;

/// Directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Reserve a fresh, not yet created, directory path.
    #[must_use]
    pub fn new() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let n = NEXT.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("byteblaster-test-{}-{n}", process::id()));
        let _ = fs::remove_dir_all(&path);
        Self { path }
    }

    /// Path of the directory.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Read a file written below the directory.
    ///
    /// # Errors
    ///
    /// Returns any error raised while reading.
    pub fn read(&self, name: &str) -> std::io::Result<Vec<u8>> { fs::read(self.path.join(name)) }
}

impl Default for ScratchDir {
    fn default() -> Self { Self::new() }
}

impl Drop for ScratchDir {
    fn drop(&mut self) { let _ = fs::remove_dir_all(&self.path); }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn scratch_dir() -> ScratchDir { ScratchDir::new() }
