//! # pwmirror-sync
//!
//! Signal-guarded staging and the merge-copy synchronizer for the local
//! credential mirror.
//!
//! Call [`synchronize`] to update the platform mirror for one user, or
//! [`synchronize_with`] with explicit paths and retry policy. The mirror is
//! only ever replaced by an atomic rename of an exclusively-created staging
//! file, and a termination signal while the staging file exists removes it
//! and exits.

pub mod error;
pub mod mirror;
pub mod signal;
pub mod staging;

pub use error::SyncError;
pub use mirror::{synchronize, synchronize_with, SyncOutcome};
pub use staging::{RetryPolicy, StagingFile};
