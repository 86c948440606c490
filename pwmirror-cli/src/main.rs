//! pwmirror — copy one user's authoritative credential record into the
//! local mirror.
//!
//! # Usage
//!
//! ```text
//! pwmirror [username] [--source <path>] [--mirror <path>]
//!          [--retry-attempts <n>] [--retry-delay-ms <ms>] [--json]
//! ```
//!
//! Exit status is 0 when the mirror was updated or had no record to update,
//! 1 on any failure. A missing mirror fails without output; every other
//! failure prints one diagnostic line on stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use pwmirror_core::{paths, MirrorPaths, Username};
use pwmirror_sync::{synchronize_with, RetryPolicy, SyncOutcome};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pwmirror",
    version,
    about = "Copy one user's credential record from the system database into its local mirror",
    long_about = None,
)]
struct Cli {
    /// User whose record to copy (defaults to the invoking user).
    username: Option<String>,

    /// Read records from this file instead of the platform database.
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Write to this mirror instead of the one derived from the source.
    #[arg(long, value_name = "PATH")]
    mirror: Option<PathBuf>,

    /// Give up after this many attempts to claim the staging file.
    #[arg(long, value_name = "N", default_value_t = 10)]
    retry_attempts: u32,

    /// Delay between staging attempts, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Emit the outcome as one JSON object on stdout.
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pwmirror: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let username = resolve_username(&cli)?;
    let mirror_paths = resolve_paths(&cli);
    let policy = RetryPolicy {
        max_attempts: cli.retry_attempts,
        delay: Duration::from_millis(cli.retry_delay_ms),
    };

    match synchronize_with(&mirror_paths, &policy, &username) {
        Ok(outcome) => {
            report(&outcome, &username, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_silent() => Ok(ExitCode::FAILURE),
        Err(err) => {
            if cli.json {
                let failure = FailureReport::Failed {
                    error: err.to_string(),
                };
                println!("{}", serde_json::to_string(&failure)?);
            }
            eprintln!("pwmirror: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Shape of the `--json` line emitted for a loud failure.
#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
enum FailureReport {
    Failed { error: String },
}

// ---------------------------------------------------------------------------
// Argument resolution
// ---------------------------------------------------------------------------

fn resolve_username(cli: &Cli) -> Result<Username> {
    if let Some(name) = &cli.username {
        anyhow::ensure!(!name.is_empty(), "username must not be empty");
        return Ok(Username::from(name.as_str()));
    }
    invoking_user()
}

/// Account name of the real uid, for the no-argument invocation.
fn invoking_user() -> Result<Username> {
    let uid = nix::unistd::getuid();
    let user = nix::unistd::User::from_uid(uid)
        .with_context(|| format!("could not look up uid {uid}"))?
        .with_context(|| format!("uid {uid} has no account record"))?;
    Ok(Username::from(user.name.as_str()))
}

fn resolve_paths(cli: &Cli) -> MirrorPaths {
    // Overrides relocate the files; the sensitivity class stays the
    // platform's, so staged modes match the real database's.
    let mut mirror_paths = MirrorPaths::system();
    if let Some(source) = &cli.source {
        mirror_paths = MirrorPaths::derived(source.clone(), mirror_paths.restricted);
    }
    if let Some(mirror) = &cli.mirror {
        mirror_paths.mirror = mirror.clone();
        mirror_paths.staging = paths::staging_for(&mirror_paths.mirror);
    }
    mirror_paths
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

fn report(outcome: &SyncOutcome, username: &Username, json: bool) -> Result<()> {
    if json {
        let line = OutcomeReport {
            user: username,
            outcome,
        };
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }
    if let SyncOutcome::Updated { path } = outcome {
        println!("Updated {} with the new record.", path.display());
    }
    Ok(())
}

/// Shape of the `--json` line for a finished run: the user plus the
/// outcome's own tag and path.
#[derive(Serialize)]
struct OutcomeReport<'a> {
    user: &'a Username,
    #[serde(flatten)]
    outcome: &'a SyncOutcome,
}
