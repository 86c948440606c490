//! Scoped signal blocking and the staging cleanup handler.
//!
//! Two cooperating pieces keep a termination signal from stranding a staging
//! file:
//!
//! - [`SignalBlock`] masks the four catchable termination signals for the
//!   calling thread and restores the previous mask on drop. It covers the
//!   window between staging-file creation and handler installation, and the
//!   finalize endgame around the rename.
//! - [`CleanupHandler`] publishes the staging path for an async handler that
//!   unlinks it and terminates with exit code 1, and restores the previous
//!   dispositions when dropped. One per process; the slot is the handler's
//!   only channel, so a second concurrent arm is rejected.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use nix::sys::signal::{
    sigaction, sigprocmask, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

/// Signals that must not interrupt staging-file bookkeeping: hang-up,
/// interrupt, quit, terminate.
pub const CLEANUP_SIGNALS: [Signal; 4] = [
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTERM,
];

fn cleanup_mask() -> SigSet {
    let mut mask = SigSet::empty();
    for sig in CLEANUP_SIGNALS {
        mask.add(sig);
    }
    mask
}

// ---------------------------------------------------------------------------
// Async handler state
// ---------------------------------------------------------------------------

// Path the handler unlinks. Null while no staging file is live. Published by
// `CleanupHandler::arm` and retracted only after the dispositions that could
// run the handler are restored.
static STAGING_PATH: AtomicPtr<libc::c_char> = AtomicPtr::new(ptr::null_mut());

extern "C" fn remove_staging_and_exit(_: libc::c_int) {
    let path = STAGING_PATH.load(Ordering::SeqCst);
    // SAFETY: only async-signal-safe calls. `path`, when non-null, is a
    // NUL-terminated string published by `CleanupHandler::arm` and kept
    // alive until after the handler is uninstalled.
    unsafe {
        if !path.is_null() {
            libc::unlink(path);
        }
        libc::_exit(1);
    }
}

// ---------------------------------------------------------------------------
// SignalBlock
// ---------------------------------------------------------------------------

/// Blocks [`CLEANUP_SIGNALS`] for the calling thread until dropped.
///
/// Nests: each scope restores exactly the mask it saved.
pub struct SignalBlock {
    previous: SigSet,
}

impl SignalBlock {
    pub fn new() -> io::Result<Self> {
        let mut previous = SigSet::empty();
        sigprocmask(
            SigmaskHow::SIG_BLOCK,
            Some(&cleanup_mask()),
            Some(&mut previous),
        )?;
        Ok(Self { previous })
    }
}

impl Drop for SignalBlock {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
    }
}

// ---------------------------------------------------------------------------
// CleanupHandler
// ---------------------------------------------------------------------------

/// Armed process-wide cleanup: on any of [`CLEANUP_SIGNALS`], unlink the
/// published staging path and terminate with exit code 1.
///
/// Arm only while the signals are blocked, so delivery cannot slip between
/// publishing the path and installing the handler.
#[derive(Debug)]
pub struct CleanupHandler {
    saved: Vec<(Signal, SigAction)>,
}

impl CleanupHandler {
    /// Publish `staging` and install the handler for all four signals,
    /// saving the previous dispositions.
    ///
    /// Fails if another handler is already armed in this process or if any
    /// installation fails; a partial installation is rolled back.
    pub fn arm(staging: &Path) -> io::Result<Self> {
        let c_path = CString::new(staging.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "staging path contains NUL"))?;
        let raw = c_path.into_raw();
        if STAGING_PATH
            .compare_exchange(ptr::null_mut(), raw, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // SAFETY: `raw` came from `into_raw` above and was never
            // published.
            drop(unsafe { CString::from_raw(raw) });
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a staging cleanup handler is already armed in this process",
            ));
        }

        let action = SigAction::new(
            SigHandler::Handler(remove_staging_and_exit),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let mut saved = Vec::with_capacity(CLEANUP_SIGNALS.len());
        for sig in CLEANUP_SIGNALS {
            // SAFETY: the handler performs only async-signal-safe operations
            // (an atomic load, unlink, _exit).
            match unsafe { sigaction(sig, &action) } {
                Ok(old) => saved.push((sig, old)),
                Err(errno) => {
                    for (sig, old) in saved {
                        // SAFETY: restoring a disposition previously returned
                        // by sigaction for this signal.
                        let _ = unsafe { sigaction(sig, &old) };
                    }
                    let raw = STAGING_PATH.swap(ptr::null_mut(), Ordering::SeqCst);
                    // SAFETY: `raw` is the pointer published above, and no
                    // disposition still points at the handler.
                    drop(unsafe { CString::from_raw(raw) });
                    return Err(errno.into());
                }
            }
        }
        Ok(Self { saved })
    }
}

impl Drop for CleanupHandler {
    fn drop(&mut self) {
        // Mask the signals while tearing down so the handler cannot run
        // against a half-retracted slot on this thread.
        let _block = SignalBlock::new().ok();
        for (sig, old) in self.saved.drain(..) {
            // SAFETY: restoring a disposition previously returned by
            // sigaction for this signal.
            let _ = unsafe { sigaction(sig, &old) };
        }
        let raw = STAGING_PATH.swap(ptr::null_mut(), Ordering::SeqCst);
        if !raw.is_null() {
            // SAFETY: `raw` was published by `arm` from `CString::into_raw`;
            // the dispositions are restored, so the handler can no longer
            // observe it.
            drop(unsafe { CString::from_raw(raw) });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
