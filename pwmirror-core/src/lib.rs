//! Pwmirror core library — record model, line reader, path configuration.
//!
//! Public API surface:
//! - [`types`] — newtypes ([`Username`])
//! - [`record`] — colon-delimited [`Record`] and key extraction
//! - [`reader`] — [`LineReader`], the growable one-line-per-call reader
//! - [`paths`] — [`MirrorPaths`], the source/mirror/staging file triple

pub mod paths;
pub mod reader;
pub mod record;
pub mod types;

pub use paths::MirrorPaths;
pub use reader::LineReader;
pub use record::Record;
pub use types::Username;
