//! Fixed file locations for the credential mirror.
//!
//! # Layout
//!
//! ```text
//! <source>            authoritative credential database (platform-selected)
//! <source>.local      the local mirror kept in sync by this crate
//! <source>.local.tmp  exclusively-created staging file for one update
//! ```
//!
//! Every synchronization entry point takes a [`MirrorPaths`] so tests can
//! point the whole protocol at a temporary directory; [`MirrorPaths::system`]
//! is the production triple under `/etc`.

use std::path::{Path, PathBuf};

/// Suffix appended to the source path to name the mirror.
pub const MIRROR_SUFFIX: &str = ".local";

/// Suffix appended to the mirror path to name the staging file.
pub const STAGING_SUFFIX: &str = ".tmp";

/// `<mirror>.tmp` — pure, no I/O.
pub fn staging_for(mirror: &Path) -> PathBuf {
    PathBuf::from(format!("{}{}", mirror.display(), STAGING_SUFFIX))
}

// ---------------------------------------------------------------------------
// MirrorPaths
// ---------------------------------------------------------------------------

/// Locations of the three files one synchronization touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorPaths {
    /// Authoritative credential database, opened read-only.
    pub source: PathBuf,
    /// Local mirror, replaced only by an atomic rename.
    pub mirror: PathBuf,
    /// Exclusively-created staging file, `<mirror>.tmp`.
    pub staging: PathBuf,
    /// Whether the source format is access-restricted; drives the staging
    /// file mode.
    pub restricted: bool,
}

impl MirrorPaths {
    /// The production triple for this platform.
    ///
    /// `/etc/master.passwd` on the BSD family, `/etc/shadow` on Linux,
    /// `/etc/passwd` elsewhere. The first two are access-restricted formats.
    pub fn system() -> Self {
        #[cfg(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly",
            target_os = "macos"
        ))]
        {
            Self::derived("/etc/master.passwd", true)
        }
        #[cfg(target_os = "linux")]
        {
            Self::derived("/etc/shadow", true)
        }
        #[cfg(not(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly",
            target_os = "macos",
            target_os = "linux"
        )))]
        {
            Self::derived("/etc/passwd", false)
        }
    }

    /// Derive the mirror and staging paths from a source path.
    pub fn derived(source: impl Into<PathBuf>, restricted: bool) -> Self {
        let source = source.into();
        let mirror = PathBuf::from(format!("{}{}", source.display(), MIRROR_SUFFIX));
        let staging = staging_for(&mirror);
        Self {
            source,
            mirror,
            staging,
            restricted,
        }
    }

    /// Creation mode for the staging file: `0600` for access-restricted
    /// source formats, `0644` otherwise. The mirror inherits it on rename.
    pub fn staging_mode(&self) -> u32 {
        if self.restricted {
            0o600
        } else {
            0o644
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_appends_both_suffixes() {
        let paths = MirrorPaths::derived("/etc/passwd", false);
        assert_eq!(paths.source, PathBuf::from("/etc/passwd"));
        assert_eq!(paths.mirror, PathBuf::from("/etc/passwd.local"));
        assert_eq!(paths.staging, PathBuf::from("/etc/passwd.local.tmp"));
    }

    #[test]
    fn derived_keeps_arbitrary_directories() {
        let paths = MirrorPaths::derived("/var/db/creds", true);
        assert_eq!(paths.mirror, PathBuf::from("/var/db/creds.local"));
        assert_eq!(paths.staging, PathBuf::from("/var/db/creds.local.tmp"));
        assert!(paths.restricted);
    }

    #[test]
    fn staging_mode_follows_restriction() {
        assert_eq!(MirrorPaths::derived("/p", true).staging_mode(), 0o600);
        assert_eq!(MirrorPaths::derived("/p", false).staging_mode(), 0o644);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn system_uses_shadow_on_linux() {
        let paths = MirrorPaths::system();
        assert_eq!(paths.source, PathBuf::from("/etc/shadow"));
        assert_eq!(paths.mirror, PathBuf::from("/etc/shadow.local"));
        assert!(paths.restricted);
    }

    #[test]
    fn staging_for_is_mirror_plus_suffix() {
        assert_eq!(
            staging_for(Path::new("/tmp/m.local")),
            PathBuf::from("/tmp/m.local.tmp")
        );
    }
}
