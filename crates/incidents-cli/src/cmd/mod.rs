//! Subcommand handlers for `inc`.
//!
//! Handlers render their own failures through [`crate::output`] and return a
//! [`Reported`] error so `main` only has to pick the exit code.

pub mod archive;
pub mod create;
pub mod delete;
pub mod import;
pub mod init;
pub mod list;
pub mod show;
pub mod status;
pub mod unarchive;

use crate::output::{CliError, OutputMode, render_error};
use incidents_core::config::{self, ProjectConfig};
use incidents_core::error::ErrorCode;
use incidents_core::persist::JsonFileStore;
use incidents_core::store::{IncidentStore, StartupReport, StoreError};
use std::fmt;
use std::path::Path;

/// A failure that has already been shown to the user.
#[derive(Debug)]
pub struct Reported(pub String);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Reported {}

/// Render `error` to stderr and return the matching [`Reported`] failure.
pub fn fail(output: OutputMode, error: &CliError) -> anyhow::Error {
    if let Err(render_err) = render_error(output, error) {
        tracing::debug!(error = %render_err, "failed to render error");
    }
    Reported(error.message.clone()).into()
}

pub fn fail_code(output: OutputMode, code: ErrorCode, message: impl Into<String>) -> anyhow::Error {
    fail(output, &CliError::from_code(code, message))
}

pub fn fail_store(output: OutputMode, err: &StoreError) -> anyhow::Error {
    fail(output, &CliError::from(err))
}

pub fn not_found(output: OutputMode, id: &str) -> anyhow::Error {
    fail_code(
        output,
        ErrorCode::IncidentNotFound,
        format!("incident '{id}' not found"),
    )
}

/// An opened, locked data directory.
pub struct Project {
    pub store: IncidentStore<JsonFileStore>,
    pub config: ProjectConfig,
}

/// Load config and open the store in an existing data directory.
pub fn open_project(data_dir: &Path, output: OutputMode) -> anyhow::Result<Project> {
    if !data_dir.is_dir() {
        return Err(fail_code(
            output,
            ErrorCode::NotInitialized,
            format!("no incident store at {}", data_dir.display()),
        ));
    }

    let config = config::load_config(data_dir)
        .map_err(|e| fail_code(output, ErrorCode::ConfigParseError, format!("{e:#}")))?;
    let (store, report) =
        IncidentStore::open_dir(data_dir, &config.store).map_err(|e| fail_store(output, &e))?;
    warn_if_recovered(&report, output);

    Ok(Project { store, config })
}

/// Tell the user when startup had to quarantine an unreadable store.
pub fn warn_if_recovered(report: &StartupReport, output: OutputMode) {
    let StartupReport::Recovered {
        code,
        reason,
        quarantined,
    } = report
    else {
        return;
    };

    tracing::warn!(%code, %reason, "incident store was reset");
    if output.is_json() {
        return;
    }
    let moved = quarantined.as_ref().map_or_else(
        || "nothing was moved".to_string(),
        |path| format!("old copy moved to {}", path.display()),
    );
    eprintln!("warning[{code}]: incident store was unreadable and has been reset; {moved}");
}
