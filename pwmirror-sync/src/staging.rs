//! Exclusive staging-file acquisition.
//!
//! [`StagingFile`] pairs creation of the staging file with the obligation to
//! remove it. The cleanup signal handler is armed for exactly as long as the
//! file exists; retirement is explicit — [`StagingFile::commit`] renames the
//! file onto the mirror, [`StagingFile::discard`] unlinks it — and an early
//! drop unlinks it as a safety net. Both retirement paths tear the handler
//! down under a signal block.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use pwmirror_core::paths::MirrorPaths;

use crate::error::{staging_io_err, SyncError};
use crate::signal::{CleanupHandler, SignalBlock};

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Bounded, fixed-delay retry for exclusive staging-file creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Creation attempts before reporting the staging path busy. At least
    /// one attempt is always made.
    pub max_attempts: u32,
    /// Fixed pause between attempts; no backoff, no jitter.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// StagingFile
// ---------------------------------------------------------------------------

/// An exclusively-created staging file, removed on every exit path.
///
/// While the value lives, the staging file exists on disk and the cleanup
/// handler is armed for it.
#[derive(Debug)]
pub struct StagingFile {
    file: File,
    path: PathBuf,
    handler: Option<CleanupHandler>,
    retired: bool,
}

impl StagingFile {
    /// Exclusively create `paths.staging` with the sensitivity-derived mode,
    /// arming the cleanup handler before signals are unblocked.
    ///
    /// Losses of the creation race (the path already exists) are retried per
    /// `policy`; any other failure is immediate. The pre-existing file of a
    /// concurrent writer is never removed.
    pub fn create(paths: &MirrorPaths, policy: &RetryPolicy) -> Result<StagingFile, SyncError> {
        let staging = &paths.staging;
        let mut attempt = 0;
        loop {
            attempt += 1;
            // Block the cleanup signals so delivery cannot slip between
            // file creation and handler installation.
            let block = SignalBlock::new().map_err(|e| staging_io_err(staging, e))?;
            match open_exclusive(staging, paths.staging_mode()) {
                Ok(file) => {
                    let handler = match CleanupHandler::arm(staging) {
                        Ok(handler) => handler,
                        Err(e) => {
                            // The file exists but nothing guards it yet;
                            // remove it before reporting.
                            let _ = fs::remove_file(staging);
                            return Err(staging_io_err(staging, e));
                        }
                    };
                    drop(block);
                    tracing::debug!("staged {}", staging.display());
                    return Ok(StagingFile {
                        file,
                        path: staging.clone(),
                        handler: Some(handler),
                        retired: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    drop(block);
                    if attempt >= policy.max_attempts {
                        return Err(SyncError::StagingBusy {
                            path: staging.clone(),
                            attempts: attempt,
                        });
                    }
                    thread::sleep(policy.delay);
                }
                Err(e) => return Err(staging_io_err(staging, e)),
            }
        }
    }

    /// Handle for writing staged content.
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Where the staging file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename the staging file onto `mirror` and disarm cleanup.
    ///
    /// On rename failure the staging file is unlinked and the mirror is left
    /// untouched. The containing directory is synced best-effort afterwards
    /// so the rename itself is durable.
    pub fn commit(mut self, mirror: &Path) -> Result<(), SyncError> {
        let commit_err = |path: &Path, source: io::Error| SyncError::Commit {
            from: path.to_path_buf(),
            to: mirror.to_path_buf(),
            source,
        };
        // Re-block for the endgame: a signal landing between the rename and
        // the handler teardown would otherwise unlink nothing and exit 1
        // after the mirror was already replaced.
        let block = SignalBlock::new().map_err(|e| commit_err(&self.path, e))?;
        if let Err(e) = fs::rename(&self.path, mirror) {
            let _ = fs::remove_file(&self.path);
            self.retired = true;
            self.handler = None;
            return Err(commit_err(&self.path, e));
        }
        self.retired = true;
        self.handler = None;
        drop(block);
        sync_parent_dir(mirror);
        Ok(())
    }

    /// Unlink the staging file and disarm cleanup without touching the
    /// mirror.
    pub fn discard(mut self) {
        let _block = SignalBlock::new().ok();
        let _ = fs::remove_file(&self.path);
        self.retired = true;
        self.handler = None;
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.retired {
            return;
        }
        let _ = fs::remove_file(&self.path);
        // `handler` drops next, restoring dispositions and retracting the
        // published path only after the file is gone.
    }
}

fn open_exclusive(path: &Path, mode: u32) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)
}

// Best-effort: a failure to sync the directory does not undo the rename.
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
