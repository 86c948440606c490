//! Error types for pwmirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use pwmirror_core::types::Username;

/// All errors that can arise from one synchronization attempt.
///
/// Every variant is fatal; none leaves a staging file behind, and only a
/// committed rename ever mutates the mirror.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The authoritative source could not be opened or read.
    #[error("can't read {path}; not updating the local mirror: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No record in the authoritative source carries the requested key.
    #[error("can't find {user} in {path}; not updating the local mirror")]
    UserNotFound { user: Username, path: PathBuf },

    /// The mirror file does not exist. Fatal but silent: an absent mirror
    /// means mirroring was never initialized here.
    #[error("no local mirror at {path}")]
    MirrorMissing { path: PathBuf },

    /// The mirror file exists but could not be opened.
    #[error("can't open {path}; not updating the local mirror: {source}")]
    MirrorUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Exclusive creation of the staging file kept losing the race.
    #[error("{path} still exists after {attempts} attempts; not updating the local mirror")]
    StagingBusy { path: PathBuf, attempts: u32 },

    /// The staging file could not be created for a non-contention reason.
    #[error("can't open {path} for writing; not updating the local mirror: {source}")]
    StagingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the mirror or writing the staging file failed mid-copy.
    #[error("error copying {from} to {to}; not updating the local mirror: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The atomic rename of the staging file onto the mirror failed.
    #[error("error renaming {from} to {to}; not updating the local mirror: {source}")]
    Commit {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// True for errors that exit nonzero without printing a diagnostic.
    pub fn is_silent(&self) -> bool {
        matches!(self, SyncError::MirrorMissing { .. })
    }
}

/// Convenience constructor for [`SyncError::SourceUnreadable`].
pub(crate) fn source_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::SourceUnreadable {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::StagingIo`].
pub(crate) fn staging_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::StagingIo {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_missing_mirror_is_silent() {
        let missing = SyncError::MirrorMissing {
            path: PathBuf::from("/etc/shadow.local"),
        };
        assert!(missing.is_silent());

        let not_found = SyncError::UserNotFound {
            user: Username::from("alice"),
            path: PathBuf::from("/etc/shadow"),
        };
        assert!(!not_found.is_silent());
    }

    #[test]
    fn diagnostics_name_the_paths_involved() {
        let err = SyncError::Copy {
            from: PathBuf::from("/etc/shadow.local"),
            to: PathBuf::from("/etc/shadow.local.tmp"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/shadow.local"), "got: {msg}");
        assert!(msg.contains("/etc/shadow.local.tmp"), "got: {msg}");
        assert!(msg.contains("not updating the local mirror"), "got: {msg}");
    }

    #[test]
    fn busy_diagnostic_reports_the_attempt_count() {
        let err = SyncError::StagingBusy {
            path: PathBuf::from("/etc/shadow.local.tmp"),
            attempts: 10,
        };
        assert!(err.to_string().contains("after 10 attempts"));
    }
}
