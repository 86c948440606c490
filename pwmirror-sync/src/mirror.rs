//! Merge-copy synchronization of the local credential mirror.
//!
//! ## `synchronize_with` — protocol
//!
//! 1. Scan the authoritative source for the first record keyed by the
//!    username; absence is fatal.
//! 2. Open the mirror for reading. A missing mirror fails silently.
//! 3. Exclusively create the staging file under a signal block and arm
//!    cleanup ([`StagingFile::create`]).
//! 4. Copy mirror records into the staging file, substituting the retained
//!    authoritative record for the first key match, one `\n` per record.
//! 5. Finalize: no match — discard and report a skip; copy error — discard
//!    and fail; otherwise rename the staging file onto the mirror.
//!
//! The skip outcome takes precedence over a latched copy error: either way
//! the staged content is thrown away and the mirror stays untouched.
//!
//! Tests always go through [`synchronize_with`]; the [`synchronize`] wrapper
//! touches the platform paths under `/etc`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use pwmirror_core::{
    paths::MirrorPaths,
    reader::LineReader,
    record::{line_matches, Record},
    types::Username,
};

use crate::error::{source_err, SyncError};
use crate::staging::{RetryPolicy, StagingFile};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one successful synchronization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SyncOutcome {
    /// The mirror now carries the authoritative record.
    Updated { path: PathBuf },
    /// The mirror has no record for the user; nothing was written.
    Skipped { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Synchronize the platform mirror for `username` with the default retry
/// policy.
pub fn synchronize(username: &Username) -> Result<SyncOutcome, SyncError> {
    synchronize_with(&MirrorPaths::system(), &RetryPolicy::default(), username)
}

/// Synchronize the mirror described by `paths` for `username`.
///
/// Returns [`SyncOutcome::Updated`] after a committed rename and
/// [`SyncOutcome::Skipped`] when the mirror has no record for the user; both
/// are success. Every error path removes the staging file and leaves the
/// mirror byte-for-byte as it was.
pub fn synchronize_with(
    paths: &MirrorPaths,
    policy: &RetryPolicy,
    username: &Username,
) -> Result<SyncOutcome, SyncError> {
    let record = lookup_source_record(&paths.source, username)?;
    tracing::debug!("found {} in {}", username, paths.source.display());

    let mirror = open_mirror(&paths.mirror)?;
    let staging = StagingFile::create(paths, policy)?;
    let copy = merge_copy(mirror, &staging, &record, username);
    finalize(paths, staging, copy, username)
}

// ---------------------------------------------------------------------------
// 1. Authoritative lookup
// ---------------------------------------------------------------------------

/// First record in `source` keyed by `username`. Duplicate keys are not
/// validated against; the first occurrence wins.
fn lookup_source_record(source: &Path, username: &Username) -> Result<Record, SyncError> {
    let file = File::open(source).map_err(|e| source_err(source, e))?;
    let mut reader = LineReader::new(file);
    loop {
        match reader.next_line() {
            Ok(Some(line)) => {
                if line_matches(line, username) {
                    return Ok(Record::new(line));
                }
            }
            Ok(None) => {
                return Err(SyncError::UserNotFound {
                    user: username.clone(),
                    path: source.to_path_buf(),
                })
            }
            Err(e) => return Err(source_err(source, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Mirror open
// ---------------------------------------------------------------------------

fn open_mirror(mirror: &Path) -> Result<File, SyncError> {
    File::open(mirror).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            SyncError::MirrorMissing {
                path: mirror.to_path_buf(),
            }
        } else {
            SyncError::MirrorUnreadable {
                path: mirror.to_path_buf(),
                source: e,
            }
        }
    })
}

// ---------------------------------------------------------------------------
// 3. Merge copy
// ---------------------------------------------------------------------------

struct CopyPass {
    replaced: bool,
    error: Option<io::Error>,
}

fn merge_copy(
    mirror: File,
    staging: &StagingFile,
    record: &Record,
    username: &Username,
) -> CopyPass {
    let mut reader = LineReader::new(mirror);
    let mut out = BufWriter::new(staging.file());
    let mut replaced = false;
    let mut error: Option<io::Error> = None;

    loop {
        match reader.next_line() {
            Ok(Some(line)) => {
                let is_target = !replaced && line_matches(line, username);
                if error.is_none() {
                    let payload = if is_target { record.as_bytes() } else { line };
                    let written = out.write_all(payload).and_then(|()| out.write_all(b"\n"));
                    if let Err(e) = written {
                        // Latch the failure but keep reading: whether the
                        // mirror holds the key at all decides skip vs fail.
                        error = Some(e);
                    }
                }
                if is_target {
                    replaced = true;
                }
            }
            Ok(None) => break,
            Err(e) => {
                if error.is_none() {
                    error = Some(e);
                }
                break;
            }
        }
    }

    if error.is_none() {
        if let Err(e) = out.flush() {
            error = Some(e);
        }
    }
    drop(out);
    if error.is_none() {
        if let Err(e) = staging.file().sync_all() {
            error = Some(e);
        }
    }

    CopyPass { replaced, error }
}

// ---------------------------------------------------------------------------
// 4. Finalize
// ---------------------------------------------------------------------------

fn finalize(
    paths: &MirrorPaths,
    staging: StagingFile,
    copy: CopyPass,
    username: &Username,
) -> Result<SyncOutcome, SyncError> {
    if !copy.replaced {
        tracing::debug!(
            "no record for {} in {}; leaving it untouched",
            username,
            paths.mirror.display()
        );
        staging.discard();
        return Ok(SyncOutcome::Skipped {
            path: paths.mirror.clone(),
        });
    }
    if let Some(e) = copy.error {
        let to = staging.path().to_path_buf();
        staging.discard();
        return Err(SyncError::Copy {
            from: paths.mirror.clone(),
            to,
            source: e,
        });
    }
    staging.commit(&paths.mirror)?;
    tracing::info!("updated {}", paths.mirror.display());
    Ok(SyncOutcome::Updated {
        path: paths.mirror.clone(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
